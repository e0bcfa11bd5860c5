use axum::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{contains_pattern, OrderCancellation, Store, WorkDeletion};
use crate::models::{
    City, CreativeWork, NewOrder, NewTicket, Order, OrderStatus, OrderWithTickets, Person,
    Rating, RatingSummary, Region, Showtime, Ticket, TicketStatus, WatchlistEntry, WorkKind,
};
use crate::seed::{Fixtures, CATALOG_NOT_EMPTY};
use crate::utils::{AppError, AppResult};

const WORK_COLUMNS: &str =
    "id, title, slug, kind, description, duration_minutes, featured, created_at, updated_at";
const SHOWTIME_COLUMNS: &str = "id, creative_work_id, venue_id, starts_at, price, currency, \
     total_seats, available_seats, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, order_number, user_id, showtime_id, quantity, total_amount, \
     currency, status, created_at, updated_at";
const TICKET_COLUMNS: &str = "id, ticket_number, order_id, showtime_id, status, qr_payload, \
     scanned_at, scanned_by, created_at, updated_at";

/// Postgres-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, then apply the embedded migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!("Successfully connected to database");

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(format!("migrations failed: {e}")))?;
        tracing::info!("Migrations run successfully");

        Ok(Self::new(pool))
    }

    /// Works matching `clause`, newest first. `$1` in the clause is bound to `arg`.
    async fn works_where(&self, clause: &str, arg: Option<String>) -> AppResult<Vec<CreativeWork>> {
        let query = format!(
            "SELECT {WORK_COLUMNS} FROM creative_works WHERE {clause} ORDER BY created_at DESC"
        );
        let mut select = sqlx::query_as::<_, CreativeWork>(&query);
        if let Some(arg) = arg {
            select = select.bind(arg);
        }
        Ok(select.fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_regions(&self) -> AppResult<Vec<Region>> {
        let regions = sqlx::query_as::<_, Region>(
            "SELECT id, name, slug, created_at FROM regions ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(regions)
    }

    async fn list_cities(&self, region_slug: Option<&str>) -> AppResult<Vec<City>> {
        let cities = sqlx::query_as::<_, City>(
            "SELECT c.id, c.region_id, c.name, c.slug, c.created_at
             FROM cities c
             JOIN regions r ON r.id = c.region_id
             WHERE $1::text IS NULL OR r.slug = $1
             ORDER BY c.name",
        )
        .bind(region_slug)
        .fetch_all(&self.pool)
        .await?;
        Ok(cities)
    }

    async fn featured_works(&self) -> AppResult<Vec<CreativeWork>> {
        self.works_where("featured", None).await
    }

    async fn works_by_kind(&self, kind: WorkKind) -> AppResult<Vec<CreativeWork>> {
        self.works_where("kind = $1", Some(kind.as_str().to_string()))
            .await
    }

    async fn search_works(&self, query: &str) -> AppResult<Vec<CreativeWork>> {
        self.works_where(
            "(title ILIKE $1 OR description ILIKE $1)",
            Some(contains_pattern(query)),
        )
        .await
    }

    async fn find_work(&self, id: Uuid) -> AppResult<Option<CreativeWork>> {
        let query = format!("SELECT {WORK_COLUMNS} FROM creative_works WHERE id = $1");
        let work = sqlx::query_as::<_, CreativeWork>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(work)
    }

    async fn find_work_by_slug(&self, slug: &str) -> AppResult<Option<CreativeWork>> {
        let query = format!("SELECT {WORK_COLUMNS} FROM creative_works WHERE slug = $1");
        let work = sqlx::query_as::<_, CreativeWork>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(work)
    }

    async fn count_works(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM creative_works")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_work(&self, id: Uuid) -> AppResult<WorkDeletion> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM creative_works WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(WorkDeletion::NotFound);
        }

        // Orders reserve seats on the showtime row first, so holding these locks
        // waits out any in-flight order and blocks new ones until we commit.
        sqlx::query("SELECT id FROM showtimes WHERE creative_work_id = $1 FOR UPDATE")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let has_orders: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM orders o
                JOIN showtimes s ON s.id = o.showtime_id
                WHERE s.creative_work_id = $1
             )",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if has_orders {
            return Ok(WorkDeletion::HasOrders);
        }

        let showtimes = sqlx::query("DELETE FROM showtimes WHERE creative_work_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM ratings WHERE creative_work_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM watchlist_entries WHERE creative_work_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM creative_works WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(WorkDeletion::Deleted {
            showtimes_removed: showtimes.rows_affected(),
        })
    }

    async fn search_persons(&self, query: &str) -> AppResult<Vec<Person>> {
        let persons = sqlx::query_as::<_, Person>(
            "SELECT id, full_name, bio, created_at, updated_at
             FROM persons WHERE full_name ILIKE $1 ORDER BY full_name",
        )
        .bind(contains_pattern(query))
        .fetch_all(&self.pool)
        .await?;
        Ok(persons)
    }

    async fn showtimes_for_work(&self, work_id: Uuid) -> AppResult<Vec<Showtime>> {
        let query = format!(
            "SELECT {SHOWTIME_COLUMNS} FROM showtimes WHERE creative_work_id = $1 ORDER BY starts_at"
        );
        let showtimes = sqlx::query_as::<_, Showtime>(&query)
            .bind(work_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(showtimes)
    }

    async fn find_showtime(&self, id: Uuid) -> AppResult<Option<Showtime>> {
        let query = format!("SELECT {SHOWTIME_COLUMNS} FROM showtimes WHERE id = $1");
        let showtime = sqlx::query_as::<_, Showtime>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(showtime)
    }

    async fn rate_work(&self, user_id: Uuid, work_id: Uuid, score: i16) -> AppResult<Rating> {
        let rating = sqlx::query_as::<_, Rating>(
            "INSERT INTO ratings (id, user_id, creative_work_id, score)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, creative_work_id)
             DO UPDATE SET score = EXCLUDED.score, updated_at = NOW()
             RETURNING id, user_id, creative_work_id, score, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(work_id)
        .bind(score)
        .fetch_one(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn rating_summary(&self, work_id: Uuid) -> AppResult<RatingSummary> {
        let (count, average): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(score)::float8 FROM ratings WHERE creative_work_id = $1",
        )
        .bind(work_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(RatingSummary { count, average })
    }

    async fn list_watchlist(&self, user_id: Uuid) -> AppResult<Vec<WatchlistEntry>> {
        let entries = sqlx::query_as::<_, WatchlistEntry>(
            "SELECT id, user_id, creative_work_id, created_at
             FROM watchlist_entries WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn add_to_watchlist(&self, user_id: Uuid, work_id: Uuid) -> AppResult<WatchlistEntry> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let entry = sqlx::query_as::<_, WatchlistEntry>(
            "INSERT INTO watchlist_entries (id, user_id, creative_work_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, creative_work_id)
             DO UPDATE SET user_id = EXCLUDED.user_id
             RETURNING id, user_id, creative_work_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(work_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn remove_from_watchlist(&self, user_id: Uuid, work_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM watchlist_entries WHERE user_id = $1 AND creative_work_id = $2",
        )
        .bind(user_id)
        .bind(work_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_order(
        &self,
        order: NewOrder,
        tickets: Vec<NewTicket>,
    ) -> AppResult<OrderWithTickets> {
        let mut tx = self.pool.begin().await?;

        let reserved = sqlx::query(
            "UPDATE showtimes
             SET available_seats = available_seats - $2, updated_at = NOW()
             WHERE id = $1 AND available_seats >= $2",
        )
        .bind(order.showtime_id)
        .bind(order.quantity)
        .execute(&mut *tx)
        .await?;

        if reserved.rows_affected() == 0 {
            let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM showtimes WHERE id = $1")
                .bind(order.showtime_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => AppError::Conflict("Not enough seats available".to_string()),
                None => AppError::NotFound(format!("Showtime '{}' not found", order.showtime_id)),
            });
        }

        let query = format!(
            "INSERT INTO orders
                (id, order_number, user_id, showtime_id, quantity, total_amount, currency, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {ORDER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Order>(&query)
            .bind(order.id)
            .bind(&order.order_number)
            .bind(order.user_id)
            .bind(order.showtime_id)
            .bind(order.quantity)
            .bind(order.total_amount)
            .bind(&order.currency)
            .bind(OrderStatus::Confirmed.as_str())
            .fetch_one(&mut *tx)
            .await?;

        let mut insert: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO tickets (id, ticket_number, order_id, showtime_id, status, qr_payload) ",
        );
        insert.push_values(&tickets, |mut row, ticket| {
            row.push_bind(ticket.id)
                .push_bind(&ticket.ticket_number)
                .push_bind(created.id)
                .push_bind(created.showtime_id)
                .push_bind(TicketStatus::Issued.as_str())
                .push_bind(&ticket.qr_payload);
        });
        insert.push(format!(" RETURNING {TICKET_COLUMNS}"));
        let mut issued = insert
            .build_query_as::<Ticket>()
            .fetch_all(&mut *tx)
            .await?;
        issued.sort_by(|a, b| a.ticket_number.cmp(&b.ticket_number));

        tx.commit().await?;

        Ok(OrderWithTickets {
            order: created,
            tickets: issued,
        })
    }

    async fn find_order_by_number(&self, order_number: &str) -> AppResult<Option<Order>> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn tickets_for_order(&self, order_id: Uuid) -> AppResult<Vec<Ticket>> {
        let query = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = $1 ORDER BY ticket_number"
        );
        let tickets = sqlx::query_as::<_, Ticket>(&query)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tickets)
    }

    async fn cancel_order(&self, order_id: Uuid) -> AppResult<OrderCancellation> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;
        match status.as_deref() {
            None => return Ok(OrderCancellation::NotFound),
            Some(s) if s == OrderStatus::Cancelled.as_str() => {
                return Ok(OrderCancellation::AlreadyCancelled)
            }
            Some(_) => {}
        }

        // Lock the tickets so a scan cannot land while we cancel.
        let statuses: Vec<String> =
            sqlx::query_scalar("SELECT status FROM tickets WHERE order_id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_all(&mut *tx)
                .await?;
        if statuses.iter().any(|s| s == TicketStatus::Scanned.as_str()) {
            return Ok(OrderCancellation::HasScannedTickets);
        }

        let query = format!(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(order_id)
            .bind(OrderStatus::Cancelled.as_str())
            .fetch_one(&mut *tx)
            .await?;

        let released = sqlx::query(
            "UPDATE tickets SET status = $2, updated_at = NOW() WHERE order_id = $1 AND status = $3",
        )
        .bind(order_id)
        .bind(TicketStatus::Cancelled.as_str())
        .bind(TicketStatus::Issued.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            "UPDATE showtimes
             SET available_seats = available_seats + $2, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(order.showtime_id)
        .bind(released as i32)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = $1 ORDER BY ticket_number"
        );
        let tickets = sqlx::query_as::<_, Ticket>(&query)
            .bind(order_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(OrderCancellation::Cancelled(OrderWithTickets { order, tickets }))
    }

    async fn find_ticket(&self, id: Uuid) -> AppResult<Option<Ticket>> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        let ticket = sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn find_ticket_by_number(&self, ticket_number: &str) -> AppResult<Option<Ticket>> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_number = $1");
        let ticket = sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn mark_ticket_scanned(
        &self,
        id: Uuid,
        scanned_by: Uuid,
        scanned_at: DateTime<Utc>,
    ) -> AppResult<Option<Ticket>> {
        let query = format!(
            "UPDATE tickets
             SET status = $4, scanned_at = $2, scanned_by = $3, updated_at = $2
             WHERE id = $1 AND status = $5
             RETURNING {TICKET_COLUMNS}"
        );
        let ticket = sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .bind(scanned_at)
            .bind(scanned_by)
            .bind(TicketStatus::Scanned.as_str())
            .bind(TicketStatus::Issued.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn insert_fixtures(&self, fixtures: &Fixtures) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Self-conflicting mode: a second seeder waits here, then sees our works.
        sqlx::query("LOCK TABLE creative_works IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM creative_works")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Err(AppError::Conflict(CATALOG_NOT_EMPTY.to_string()));
        }

        for region in &fixtures.regions {
            sqlx::query("INSERT INTO regions (id, name, slug, created_at) VALUES ($1, $2, $3, $4)")
                .bind(region.id)
                .bind(&region.name)
                .bind(&region.slug)
                .bind(region.created_at)
                .execute(&mut *tx)
                .await?;
        }

        for city in &fixtures.cities {
            sqlx::query(
                "INSERT INTO cities (id, region_id, name, slug, created_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(city.id)
            .bind(city.region_id)
            .bind(&city.name)
            .bind(&city.slug)
            .bind(city.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for venue in &fixtures.venues {
            sqlx::query(
                "INSERT INTO venues (id, city_id, name, address, capacity, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(venue.id)
            .bind(venue.city_id)
            .bind(&venue.name)
            .bind(&venue.address)
            .bind(venue.capacity)
            .bind(venue.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for person in &fixtures.persons {
            sqlx::query(
                "INSERT INTO persons (id, full_name, bio, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(person.id)
            .bind(&person.full_name)
            .bind(&person.bio)
            .bind(person.created_at)
            .bind(person.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for work in &fixtures.works {
            sqlx::query(
                "INSERT INTO creative_works
                    (id, title, slug, kind, description, duration_minutes, featured, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(work.id)
            .bind(&work.title)
            .bind(&work.slug)
            .bind(work.kind.as_str())
            .bind(&work.description)
            .bind(work.duration_minutes)
            .bind(work.featured)
            .bind(work.created_at)
            .bind(work.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for showtime in &fixtures.showtimes {
            sqlx::query(
                "INSERT INTO showtimes
                    (id, creative_work_id, venue_id, starts_at, price, currency,
                     total_seats, available_seats, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(showtime.id)
            .bind(showtime.creative_work_id)
            .bind(showtime.venue_id)
            .bind(showtime.starts_at)
            .bind(showtime.price)
            .bind(&showtime.currency)
            .bind(showtime.total_seats)
            .bind(showtime.available_seats)
            .bind(showtime.created_at)
            .bind(showtime.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
