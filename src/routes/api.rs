use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/calls", get(api::list_calls))
        .route("/calls/{call_id}", get(api::get_call))
        .layer(TraceLayer::new_for_http())
}
