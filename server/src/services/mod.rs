pub mod qr;
pub mod ticketing;

pub use qr::{QrClaims, QrError, QrSigner};
pub use ticketing::{TicketingService, MAX_TICKETS_PER_ORDER};
