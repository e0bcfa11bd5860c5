use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WatchlistEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub creative_work_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One score per user and work; re-rating overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub creative_work_id: Uuid,
    pub score: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub count: i64,
    pub average: Option<f64>,
}

impl RatingSummary {
    pub fn from_scores(scores: impl IntoIterator<Item = i16>) -> Self {
        let (count, total) = scores
            .into_iter()
            .fold((0i64, 0i64), |(n, sum), s| (n + 1, sum + i64::from(s)));

        Self {
            count,
            average: (count > 0).then(|| total as f64 / count as f64),
        }
    }
}
