//! Route definitions for the dashboard.

use crate::handlers;
use crate::state::AppState;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

/// Create the dashboard router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/api/metrics", get(handlers::metrics))
        .route("/api/health", get(handlers::health))
        .route(
            "/api/config",
            get(handlers::get_templates).post(handlers::replace_templates),
        )
        .route("/ws", get(handlers::ws_logs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
