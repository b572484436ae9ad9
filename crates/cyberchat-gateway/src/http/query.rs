use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{query_payload, upstream_failure, ApiFailure};
use crate::app::AppState;

const FALLBACK: &str = "Failed to process query";

/// POST /api/query: non-streaming query, answered by the upstream's
/// `/api/query/process` endpoint in one JSON document.
pub async fn process_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let req = query_payload(payload, FALLBACK)?;
    info!(plugin_id = ?req.get("plugin_id"), "processing query");
    state
        .upstream
        .json(Method::POST, "/api/query/process", Some(&req), FALLBACK)
        .await
        .map(Json)
        .map_err(|e| upstream_failure(e, FALLBACK))
}
