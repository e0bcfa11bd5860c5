use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::state::AppState;
use crate::utils::response::{created, success};
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct PlaceOrder {
    pub showtime_id: Uuid,
    pub quantity: i32,
}

pub async fn place_order(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<PlaceOrder>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    let placed = state
        .ticketing
        .place_order(user.user_id, body.showtime_id, body.quantity)
        .await?;
    Ok(created(placed, "Order placed"))
}

/// Public lookup; the purchaser's token additionally unlocks the QR payloads.
pub async fn get_order(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> AppResult<Response> {
    let order = state
        .ticketing
        .get_order(&order_number, viewer.map(|user| user.user_id))
        .await?;
    Ok(success(order, "Order retrieved"))
}

pub async fn cancel_order(
    user: AuthUser,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> AppResult<Response> {
    let order = state
        .ticketing
        .cancel_order(&order_number, user.user_id)
        .await?;
    Ok(success(order, "Order cancelled"))
}
