use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::state::AppState;
use crate::utils::response::success;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct CityFilter {
    /// Region slug.
    pub region: Option<String>,
}

pub async fn list_regions(State(state): State<AppState>) -> AppResult<Response> {
    let regions = state.store.list_regions().await?;
    Ok(success(regions, "Regions retrieved"))
}

pub async fn list_cities(
    State(state): State<AppState>,
    Query(filter): Query<CityFilter>,
) -> AppResult<Response> {
    let region = filter.region.as_deref().filter(|r| !r.is_empty());
    let cities = state.store.list_cities(region).await?;
    Ok(success(cities, "Cities retrieved"))
}
