//! Health and call inspection endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::core::call::SessionInfo;
use crate::state::AppState;

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
pub struct CallsResponse {
    pub active: usize,
    pub max: Option<usize>,
    pub calls: Vec<SessionInfo>,
}

/// List live calls, oldest first
pub async fn list_calls(State(state): State<Arc<AppState>>) -> Json<CallsResponse> {
    let calls = state.registry.snapshot();
    Json(CallsResponse {
        active: calls.len(),
        max: state.config.max_concurrent_calls,
        calls,
    })
}

/// Inspect one live call
pub async fn get_call(
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Result<Json<SessionInfo>, StatusCode> {
    state
        .registry
        .get(&call_id)
        .map(|handle| Json(handle.info()))
        .ok_or(StatusCode::NOT_FOUND)
}
