use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness check, returns server metadata and the relay limits.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let upstream = &state.config.upstream;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "upstream": state.upstream.base_url(),
        "connect_timeout_secs": upstream.connect_timeout_secs,
        "idle_timeout_secs": upstream.idle_timeout_secs,
    }))
}
