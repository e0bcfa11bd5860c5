use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Issued,
    Scanned,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Issued => "issued",
            TicketStatus::Scanned => "scanned",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(TicketStatus::Issued),
            "scanned" => Ok(TicketStatus::Scanned),
            "cancelled" => Ok(TicketStatus::Cancelled),
            other => Err(UnknownVariant {
                kind: "ticket status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for TicketStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub order_id: Uuid,
    pub showtime_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: TicketStatus,
    /// Empty when withheld from a caller other than the purchaser.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub qr_payload: String,
    pub scanned_at: Option<DateTime<Utc>>,
    pub scanned_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Human-facing number printed on the ticket, e.g. `TKT-9F2C04A1B7`.
    pub fn generate_number() -> String {
        let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("TKT-{}", &suffix[..10])
    }
}

/// A ticket about to be persisted alongside its order.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub id: Uuid,
    pub ticket_number: String,
    pub qr_payload: String,
}

pub const TICKET_NOT_FOUND: &str = "Ticket not found";
pub const TICKET_ALREADY_SCANNED: &str = "Ticket already scanned";
pub const TICKET_CANCELLED: &str = "Ticket has been cancelled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TicketValidation {
    /// Only an existing ticket that has not been scanned or cancelled is valid.
    pub fn of(ticket: Option<&Ticket>) -> Self {
        let reason = match ticket.map(|t| t.status) {
            None => Some(TICKET_NOT_FOUND),
            Some(TicketStatus::Issued) => None,
            Some(TicketStatus::Scanned) => Some(TICKET_ALREADY_SCANNED),
            Some(TicketStatus::Cancelled) => Some(TICKET_CANCELLED),
        };

        Self {
            valid: reason.is_none(),
            error: reason.map(str::to_string),
        }
    }
}
