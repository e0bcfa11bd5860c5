use axum::extract::State;
use axum::response::Response;

use crate::auth::AdminUser;
use crate::seed;
use crate::state::AppState;
use crate::utils::response::created;
use crate::utils::AppResult;

pub async fn seed_catalog(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Response> {
    tracing::info!(admin = %admin.user_id, "Seeding requested");
    let summary = seed::run(state.store.as_ref()).await?;
    Ok(created(summary, "Fixture catalog inserted"))
}
