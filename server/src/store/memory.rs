use axum::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{OrderCancellation, Store, WorkDeletion};
use crate::models::{
    City, CreativeWork, NewOrder, NewTicket, Order, OrderStatus, OrderWithTickets, Person,
    Rating, RatingSummary, Region, Showtime, Ticket, TicketStatus, Venue, WatchlistEntry,
    WorkKind,
};
use crate::seed::{Fixtures, CATALOG_NOT_EMPTY};
use crate::utils::{AppError, AppResult};

#[derive(Default)]
struct Tables {
    regions: Vec<Region>,
    cities: Vec<City>,
    venues: Vec<Venue>,
    persons: Vec<Person>,
    works: Vec<CreativeWork>,
    showtimes: Vec<Showtime>,
    ratings: Vec<Rating>,
    watchlist: Vec<WatchlistEntry>,
    orders: Vec<Order>,
    tickets: Vec<Ticket>,
}

/// In-process store. Each call holds the table lock for its whole duration,
/// which gives the same atomicity the Postgres transactions provide.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_name<T: Clone>(items: impl Iterator<Item = T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by(|a, b| name(a).cmp(name(b)));
    items
}

fn newest_first(mut works: Vec<CreativeWork>) -> Vec<CreativeWork> {
    works.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    works
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_regions(&self) -> AppResult<Vec<Region>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_name(tables.regions.iter().cloned(), |r| &r.name))
    }

    async fn list_cities(&self, region_slug: Option<&str>) -> AppResult<Vec<City>> {
        let tables = self.tables.read().await;
        let region_id = match region_slug {
            Some(slug) => match tables.regions.iter().find(|r| r.slug == slug) {
                Some(region) => Some(region.id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        Ok(sorted_by_name(
            tables
                .cities
                .iter()
                .filter(|c| region_id.map_or(true, |id| c.region_id == id))
                .cloned(),
            |c| &c.name,
        ))
    }

    async fn featured_works(&self) -> AppResult<Vec<CreativeWork>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.works.iter().filter(|w| w.featured).cloned().collect(),
        ))
    }

    async fn works_by_kind(&self, kind: WorkKind) -> AppResult<Vec<CreativeWork>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.works.iter().filter(|w| w.kind == kind).cloned().collect(),
        ))
    }

    async fn search_works(&self, query: &str) -> AppResult<Vec<CreativeWork>> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.works.iter().filter(|w| w.matches(&needle)).cloned().collect(),
        ))
    }

    async fn find_work(&self, id: Uuid) -> AppResult<Option<CreativeWork>> {
        let tables = self.tables.read().await;
        Ok(tables.works.iter().find(|w| w.id == id).cloned())
    }

    async fn find_work_by_slug(&self, slug: &str) -> AppResult<Option<CreativeWork>> {
        let tables = self.tables.read().await;
        Ok(tables.works.iter().find(|w| w.slug == slug).cloned())
    }

    async fn count_works(&self) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.works.len() as i64)
    }

    async fn delete_work(&self, id: Uuid) -> AppResult<WorkDeletion> {
        let mut tables = self.tables.write().await;
        if !tables.works.iter().any(|w| w.id == id) {
            return Ok(WorkDeletion::NotFound);
        }

        let showtime_ids: Vec<Uuid> = tables
            .showtimes
            .iter()
            .filter(|s| s.creative_work_id == id)
            .map(|s| s.id)
            .collect();
        if tables
            .orders
            .iter()
            .any(|o| showtime_ids.contains(&o.showtime_id))
        {
            return Ok(WorkDeletion::HasOrders);
        }

        tables.showtimes.retain(|s| s.creative_work_id != id);
        tables.ratings.retain(|r| r.creative_work_id != id);
        tables.watchlist.retain(|e| e.creative_work_id != id);
        tables.works.retain(|w| w.id != id);

        Ok(WorkDeletion::Deleted {
            showtimes_removed: showtime_ids.len() as u64,
        })
    }

    async fn search_persons(&self, query: &str) -> AppResult<Vec<Person>> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().await;
        Ok(sorted_by_name(
            tables
                .persons
                .iter()
                .filter(|p| p.full_name.to_lowercase().contains(&needle))
                .cloned(),
            |p| &p.full_name,
        ))
    }

    async fn showtimes_for_work(&self, work_id: Uuid) -> AppResult<Vec<Showtime>> {
        let tables = self.tables.read().await;
        let mut showtimes: Vec<Showtime> = tables
            .showtimes
            .iter()
            .filter(|s| s.creative_work_id == work_id)
            .cloned()
            .collect();
        showtimes.sort_by_key(|s| s.starts_at);
        Ok(showtimes)
    }

    async fn find_showtime(&self, id: Uuid) -> AppResult<Option<Showtime>> {
        let tables = self.tables.read().await;
        Ok(tables.showtimes.iter().find(|s| s.id == id).cloned())
    }

    async fn rate_work(&self, user_id: Uuid, work_id: Uuid, score: i16) -> AppResult<Rating> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(rating) = tables
            .ratings
            .iter_mut()
            .find(|r| r.user_id == user_id && r.creative_work_id == work_id)
        {
            rating.score = score;
            rating.updated_at = now;
            return Ok(rating.clone());
        }

        let rating = Rating {
            id: Uuid::new_v4(),
            user_id,
            creative_work_id: work_id,
            score,
            created_at: now,
            updated_at: now,
        };
        tables.ratings.push(rating.clone());
        Ok(rating)
    }

    async fn rating_summary(&self, work_id: Uuid) -> AppResult<RatingSummary> {
        let tables = self.tables.read().await;
        Ok(RatingSummary::from_scores(
            tables
                .ratings
                .iter()
                .filter(|r| r.creative_work_id == work_id)
                .map(|r| r.score),
        ))
    }

    async fn list_watchlist(&self, user_id: Uuid) -> AppResult<Vec<WatchlistEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<WatchlistEntry> = tables
            .watchlist
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn add_to_watchlist(&self, user_id: Uuid, work_id: Uuid) -> AppResult<WatchlistEntry> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .watchlist
            .iter()
            .find(|e| e.user_id == user_id && e.creative_work_id == work_id)
        {
            return Ok(existing.clone());
        }

        let entry = WatchlistEntry {
            id: Uuid::new_v4(),
            user_id,
            creative_work_id: work_id,
            created_at: Utc::now(),
        };
        tables.watchlist.push(entry.clone());
        Ok(entry)
    }

    async fn remove_from_watchlist(&self, user_id: Uuid, work_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.watchlist.len();
        tables
            .watchlist
            .retain(|e| !(e.user_id == user_id && e.creative_work_id == work_id));
        Ok(tables.watchlist.len() < before)
    }

    async fn create_order(
        &self,
        order: NewOrder,
        tickets: Vec<NewTicket>,
    ) -> AppResult<OrderWithTickets> {
        let mut tables = self.tables.write().await;
        let showtime = tables
            .showtimes
            .iter_mut()
            .find(|s| s.id == order.showtime_id)
            .ok_or_else(|| AppError::NotFound(format!("Showtime '{}' not found", order.showtime_id)))?;

        if showtime.available_seats < order.quantity {
            return Err(AppError::Conflict("Not enough seats available".to_string()));
        }

        let now = Utc::now();
        showtime.available_seats -= order.quantity;
        showtime.updated_at = now;

        let order = Order {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            showtime_id: order.showtime_id,
            quantity: order.quantity,
            total_amount: order.total_amount,
            currency: order.currency,
            status: OrderStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        let mut tickets: Vec<Ticket> = tickets
            .into_iter()
            .map(|t| Ticket {
                id: t.id,
                ticket_number: t.ticket_number,
                order_id: order.id,
                showtime_id: order.showtime_id,
                status: TicketStatus::Issued,
                qr_payload: t.qr_payload,
                scanned_at: None,
                scanned_by: None,
                created_at: now,
                updated_at: now,
            })
            .collect();
        tickets.sort_by(|a, b| a.ticket_number.cmp(&b.ticket_number));

        tables.orders.push(order.clone());
        tables.tickets.extend(tickets.iter().cloned());

        Ok(OrderWithTickets { order, tickets })
    }

    async fn find_order_by_number(&self, order_number: &str) -> AppResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    async fn tickets_for_order(&self, order_id: Uuid) -> AppResult<Vec<Ticket>> {
        let tables = self.tables.read().await;
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .iter()
            .filter(|t| t.order_id == order_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| a.ticket_number.cmp(&b.ticket_number));
        Ok(tickets)
    }

    async fn cancel_order(&self, order_id: Uuid) -> AppResult<OrderCancellation> {
        let mut tables = self.tables.write().await;
        let tables = &mut *tables;

        let Some(order) = tables.orders.iter_mut().find(|o| o.id == order_id) else {
            return Ok(OrderCancellation::NotFound);
        };
        if order.status == OrderStatus::Cancelled {
            return Ok(OrderCancellation::AlreadyCancelled);
        }
        if tables
            .tickets
            .iter()
            .any(|t| t.order_id == order_id && t.status == TicketStatus::Scanned)
        {
            return Ok(OrderCancellation::HasScannedTickets);
        }

        let now = Utc::now();
        order.status = OrderStatus::Cancelled;
        order.updated_at = now;
        let order = order.clone();

        let mut released = 0;
        let mut tickets = Vec::new();
        for ticket in tables.tickets.iter_mut().filter(|t| t.order_id == order_id) {
            if ticket.status == TicketStatus::Issued {
                ticket.status = TicketStatus::Cancelled;
                ticket.updated_at = now;
                released += 1;
            }
            tickets.push(ticket.clone());
        }
        tickets.sort_by(|a, b| a.ticket_number.cmp(&b.ticket_number));

        if let Some(showtime) = tables.showtimes.iter_mut().find(|s| s.id == order.showtime_id) {
            showtime.available_seats += released;
            showtime.updated_at = now;
        }

        Ok(OrderCancellation::Cancelled(OrderWithTickets { order, tickets }))
    }

    async fn find_ticket(&self, id: Uuid) -> AppResult<Option<Ticket>> {
        let tables = self.tables.read().await;
        Ok(tables.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn find_ticket_by_number(&self, ticket_number: &str) -> AppResult<Option<Ticket>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .iter()
            .find(|t| t.ticket_number == ticket_number)
            .cloned())
    }

    async fn mark_ticket_scanned(
        &self,
        id: Uuid,
        scanned_by: Uuid,
        scanned_at: DateTime<Utc>,
    ) -> AppResult<Option<Ticket>> {
        let mut tables = self.tables.write().await;
        let Some(ticket) = tables
            .tickets
            .iter_mut()
            .find(|t| t.id == id && t.status == TicketStatus::Issued)
        else {
            return Ok(None);
        };

        ticket.status = TicketStatus::Scanned;
        ticket.scanned_at = Some(scanned_at);
        ticket.scanned_by = Some(scanned_by);
        ticket.updated_at = scanned_at;
        Ok(Some(ticket.clone()))
    }

    async fn insert_fixtures(&self, fixtures: &Fixtures) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.works.is_empty() {
            return Err(AppError::Conflict(CATALOG_NOT_EMPTY.to_string()));
        }
        tables.regions.extend(fixtures.regions.iter().cloned());
        tables.cities.extend(fixtures.cities.iter().cloned());
        tables.venues.extend(fixtures.venues.iter().cloned());
        tables.persons.extend(fixtures.persons.iter().cloned());
        tables.works.extend(fixtures.works.iter().cloned());
        tables.showtimes.extend(fixtures.showtimes.iter().cloned());
        Ok(())
    }
}
