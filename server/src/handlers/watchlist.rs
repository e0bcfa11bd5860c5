use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::parse_id;
use crate::auth::AuthUser;
use crate::state::AppState;
use crate::utils::response::{empty_success, success};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct AddToWatchlist {
    pub creative_work_id: Uuid,
}

pub async fn list_watchlist(user: AuthUser, State(state): State<AppState>) -> AppResult<Response> {
    let entries = state.store.list_watchlist(user.user_id).await?;
    Ok(success(entries, "Watchlist retrieved"))
}

pub async fn add_to_watchlist(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<AddToWatchlist>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    let work_id = body.creative_work_id;

    if state.store.find_work(work_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Creative work '{work_id}' not found"
        )));
    }

    let entry = state.store.add_to_watchlist(user.user_id, work_id).await?;
    Ok(success(entry, "Added to watchlist"))
}

pub async fn remove_from_watchlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(work_id): Path<String>,
) -> AppResult<Response> {
    let work_id = parse_id(&work_id, "creative work")?;

    if !state
        .store
        .remove_from_watchlist(user.user_id, work_id)
        .await?
    {
        return Err(AppError::NotFound(
            "Creative work is not on your watchlist".to_string(),
        ));
    }

    Ok(empty_success("Removed from watchlist"))
}
