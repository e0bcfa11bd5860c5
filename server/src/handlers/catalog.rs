use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_id, SearchParams};
use crate::auth::{AdminUser, AuthUser};
use crate::models::engagement::{MAX_SCORE, MIN_SCORE};
use crate::models::{WorkDetail, WorkKind};
use crate::state::AppState;
use crate::store::WorkDeletion;
use crate::utils::response::success;
use crate::utils::{AppError, AppResult};

pub async fn featured_works(State(state): State<AppState>) -> AppResult<Response> {
    let works = state.store.featured_works().await?;
    Ok(success(works, "Featured works retrieved"))
}

pub async fn works_by_type(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> AppResult<Response> {
    let kind = kind
        .parse::<WorkKind>()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    let works = state.store.works_by_kind(kind).await?;
    Ok(success(works, format!("{kind} works retrieved")))
}

pub async fn search_works(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Response> {
    let works = state.store.search_works(params.required()?).await?;
    Ok(success(works, "Search completed"))
}

pub async fn work_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    let work = state
        .store
        .find_work_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Creative work '{slug}' not found")))?;
    let showtimes = state.store.showtimes_for_work(work.id).await?;
    let rating = state.store.rating_summary(work.id).await?;

    Ok(success(
        WorkDetail {
            work,
            showtimes,
            rating,
        },
        "Creative work retrieved",
    ))
}

#[derive(Serialize)]
struct DeletedWork {
    showtimes_removed: u64,
}

pub async fn delete_work(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id, "creative work")?;

    match state.store.delete_work(id).await? {
        WorkDeletion::Deleted { showtimes_removed } => {
            tracing::info!(
                work_id = %id,
                admin = %admin.user_id,
                showtimes_removed,
                "Creative work deleted"
            );
            Ok(success(
                DeletedWork { showtimes_removed },
                "Creative work deleted",
            ))
        }
        WorkDeletion::NotFound => Err(AppError::NotFound(format!(
            "Creative work '{id}' not found"
        ))),
        WorkDeletion::HasOrders => Err(AppError::Conflict(
            "Creative work has showtimes with orders and cannot be deleted".to_string(),
        )),
    }
}

pub async fn search_persons(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Response> {
    let persons = state.store.search_persons(params.required()?).await?;
    Ok(success(persons, "Search completed"))
}

#[derive(Debug, Deserialize)]
pub struct RateWork {
    pub score: i16,
}

pub async fn rate_work(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RateWork>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    if !(MIN_SCORE..=MAX_SCORE).contains(&body.score) {
        return Err(AppError::ValidationError(format!(
            "score must be between {MIN_SCORE} and {MAX_SCORE}"
        )));
    }

    let id = parse_id(&id, "creative work")?;
    if state.store.find_work(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Creative work '{id}' not found")));
    }

    let rating = state.store.rate_work(user.user_id, id, body.score).await?;
    Ok(success(rating, "Rating saved"))
}
