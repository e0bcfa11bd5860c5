use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::response::success;
use crate::utils::{AppError, AppResult};

pub mod admin;
pub mod catalog;
pub mod locations;
pub mod orders;
pub mod tickets;
pub mod watchlist;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "marquee-api",
    };

    success(payload, "Health check successful")
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

impl SearchParams {
    /// The trimmed query, or a 400 when it is missing or blank.
    pub fn required(&self) -> AppResult<&str> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::ValidationError("Query parameter 'q' is required".to_string()))
    }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::ValidationError(format!("Invalid {what} id '{raw}'")))
}
