//! Persistence seam for the storefront.
//!
//! Handlers and services only talk to [`Store`]; [`PgStore`] backs it with
//! Postgres and [`MemoryStore`] keeps everything in process memory.
//! Every multi-row mutation (order placement, cancellation, cascade delete,
//! scanning) is atomic within a single call.

use axum::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    City, CreativeWork, NewOrder, NewTicket, Order, OrderWithTickets, Person, Rating,
    RatingSummary, Region, Showtime, Ticket, WatchlistEntry, WorkKind,
};
use crate::seed::Fixtures;
use crate::utils::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of a cascade delete of a creative work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkDeletion {
    Deleted { showtimes_removed: u64 },
    NotFound,
    /// Orders reference one of the work's showtimes; nothing was removed.
    HasOrders,
}

/// Result of cancelling an order.
#[derive(Debug, Clone)]
pub enum OrderCancellation {
    Cancelled(OrderWithTickets),
    NotFound,
    AlreadyCancelled,
    /// At least one ticket was already scanned; nothing was changed.
    HasScannedTickets,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_regions(&self) -> AppResult<Vec<Region>>;

    /// All cities, or only those of the region with the given slug.
    async fn list_cities(&self, region_slug: Option<&str>) -> AppResult<Vec<City>>;

    async fn featured_works(&self) -> AppResult<Vec<CreativeWork>>;

    async fn works_by_kind(&self, kind: WorkKind) -> AppResult<Vec<CreativeWork>>;

    async fn search_works(&self, query: &str) -> AppResult<Vec<CreativeWork>>;

    async fn find_work(&self, id: Uuid) -> AppResult<Option<CreativeWork>>;

    async fn find_work_by_slug(&self, slug: &str) -> AppResult<Option<CreativeWork>>;

    async fn count_works(&self) -> AppResult<i64>;

    /// Remove a work together with its showtimes, watchlist entries and ratings.
    async fn delete_work(&self, id: Uuid) -> AppResult<WorkDeletion>;

    async fn search_persons(&self, query: &str) -> AppResult<Vec<Person>>;

    /// Showtimes of a work ordered by start time.
    async fn showtimes_for_work(&self, work_id: Uuid) -> AppResult<Vec<Showtime>>;

    async fn find_showtime(&self, id: Uuid) -> AppResult<Option<Showtime>>;

    async fn rate_work(&self, user_id: Uuid, work_id: Uuid, score: i16) -> AppResult<Rating>;

    async fn rating_summary(&self, work_id: Uuid) -> AppResult<RatingSummary>;

    async fn list_watchlist(&self, user_id: Uuid) -> AppResult<Vec<WatchlistEntry>>;

    /// Returns the existing entry when the work is already on the list.
    async fn add_to_watchlist(&self, user_id: Uuid, work_id: Uuid) -> AppResult<WatchlistEntry>;

    async fn remove_from_watchlist(&self, user_id: Uuid, work_id: Uuid) -> AppResult<bool>;

    /// Reserve `order.quantity` seats and persist the order with its tickets.
    ///
    /// Fails with `NotFound` for an unknown showtime and `Conflict` when not
    /// enough seats are left.
    async fn create_order(
        &self,
        order: NewOrder,
        tickets: Vec<NewTicket>,
    ) -> AppResult<OrderWithTickets>;

    async fn find_order_by_number(&self, order_number: &str) -> AppResult<Option<Order>>;

    async fn tickets_for_order(&self, order_id: Uuid) -> AppResult<Vec<Ticket>>;

    /// Cancel the order and its issued tickets and release their seats.
    async fn cancel_order(&self, order_id: Uuid) -> AppResult<OrderCancellation>;

    async fn find_ticket(&self, id: Uuid) -> AppResult<Option<Ticket>>;

    async fn find_ticket_by_number(&self, ticket_number: &str) -> AppResult<Option<Ticket>>;

    /// Move a ticket from `issued` to `scanned`.
    ///
    /// Returns `None` when the ticket is not (or no longer) `issued`, so a
    /// ticket can only ever be scanned once.
    async fn mark_ticket_scanned(
        &self,
        id: Uuid,
        scanned_by: Uuid,
        scanned_at: DateTime<Utc>,
    ) -> AppResult<Option<Ticket>>;

    /// Insert a whole fixture catalog in one batch. Fails with `Conflict`,
    /// inserting nothing, when any creative work already exists.
    async fn insert_fixtures(&self, fixtures: &Fixtures) -> AppResult<()>;
}

/// Build an `ILIKE` pattern matching `query` anywhere, with wildcards escaped.
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("jazz"), "%jazz%");
        assert_eq!(contains_pattern("100%_off"), "%100\\%\\_off%");
    }
}
