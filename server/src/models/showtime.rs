use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Showtime {
    pub id: Uuid,
    pub creative_work_id: Uuid,
    pub venue_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub price: Decimal,
    pub currency: String,
    pub total_seats: i32,
    pub available_seats: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
