use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Ticket, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(OrderStatus::Confirmed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownVariant {
                kind: "order status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub showtime_id: Uuid,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Order numbers carry the purchase date, e.g. `ORD-20250314-5D1E0C9A`.
    pub fn generate_number(now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("ORD-{}-{}", now.format("%Y%m%d"), &suffix[..8])
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub showtime_id: Uuid,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithTickets {
    #[serde(flatten)]
    pub order: Order,
    pub tickets: Vec<Ticket>,
}

impl OrderWithTickets {
    /// Drop the scannable payloads, leaving ticket numbers and statuses.
    pub fn redact_qr_payloads(&mut self) {
        for ticket in &mut self.tickets {
            ticket.qr_payload.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_order_number_embeds_date() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 18, 30, 0).unwrap();
        let number = Order::generate_number(now);

        assert!(number.starts_with("ORD-20250314-"));
        assert_eq!(number.len(), "ORD-20250314-".len() + 8);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("confirmed".parse::<OrderStatus>(), Ok(OrderStatus::Confirmed));
        assert_eq!(
            OrderStatus::try_from("cancelled".to_string()),
            Ok(OrderStatus::Cancelled)
        );
        assert!("pending".parse::<OrderStatus>().is_err());
    }
}
