use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{admin, catalog, health_check, locations, orders, tickets, watchlist};
use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/regions", get(locations::list_regions))
        .route("/cities", get(locations::list_cities))
        .route("/creative-works/featured", get(catalog::featured_works))
        .route("/creative-works/search", get(catalog::search_works))
        .route("/creative-works/type/:kind", get(catalog::works_by_type))
        // `:key` is a slug for GET and an id for DELETE and ratings.
        .route(
            "/creative-works/:key",
            get(catalog::work_detail).delete(catalog::delete_work),
        )
        .route("/creative-works/:key/ratings", post(catalog::rate_work))
        .route("/persons/search", get(catalog::search_persons))
        .route(
            "/watchlist",
            get(watchlist::list_watchlist).post(watchlist::add_to_watchlist),
        )
        .route(
            "/watchlist/:creative_work_id",
            delete(watchlist::remove_from_watchlist),
        )
        .route("/orders", post(orders::place_order))
        .route("/orders/:order_number", get(orders::get_order))
        .route("/orders/:order_number/cancel", post(orders::cancel_order))
        .route(
            "/tickets/validate/:ticket_number",
            get(tickets::validate_ticket),
        )
        .route("/tickets/scan-qr", post(tickets::scan_qr))
        .route("/tickets/:ticket_id/scan", post(tickets::scan_ticket))
        .route("/admin/seed", post(admin::seed_catalog))
}

pub fn create_routes(state: AppState) -> Router {
    let production = state.config.production;
    let origins = state.config.cors_allowed_origins.clone();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(production))
        .layer(create_cors_layer(&origins))
}
