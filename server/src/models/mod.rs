use thiserror::Error;

pub mod creative_work;
pub mod engagement;
pub mod location;
pub mod order;
pub mod person;
pub mod showtime;
pub mod ticket;

pub use creative_work::{CreativeWork, WorkDetail, WorkKind};
pub use engagement::{Rating, RatingSummary, WatchlistEntry};
pub use location::{City, Region, Venue};
pub use order::{NewOrder, Order, OrderStatus, OrderWithTickets};
pub use person::Person;
pub use showtime::Showtime;
pub use ticket::{NewTicket, Ticket, TicketStatus, TicketValidation};

/// Returned when a stored or user-supplied string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
