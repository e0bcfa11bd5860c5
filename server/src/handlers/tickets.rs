use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::state::AppState;
use crate::utils::response::success;
use crate::utils::AppResult;

pub async fn validate_ticket(
    State(state): State<AppState>,
    Path(ticket_number): Path<String>,
) -> AppResult<Response> {
    let validation = state.ticketing.validate(&ticket_number).await?;
    Ok(success(validation, "Ticket validation completed"))
}

/// `ticket_id` may be the ticket's UUID or its ticket number.
pub async fn scan_ticket(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> AppResult<Response> {
    let ticket = state.ticketing.scan(&ticket_id, admin.user_id).await?;
    Ok(success(ticket, "Ticket scanned successfully"))
}

#[derive(Debug, Deserialize)]
pub struct ScanQr {
    pub payload: String,
}

pub async fn scan_qr(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    payload: Result<Json<ScanQr>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    let ticket = state.ticketing.scan_qr(&body.payload, admin.user_id).await?;
    Ok(success(ticket, "Ticket scanned successfully"))
}
