//! Plugin catalogue proxy.
//!
//! The gateway owns no plugin state; every route forwards to the
//! upstream's `/api/plugins` resource and maps failures to `{"error": …}`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

use super::{upstream_failure, ApiFailure};
use crate::app::AppState;

async fn forward(
    state: &AppState,
    method: Method,
    path: &str,
    body: Option<&Value>,
    fallback: &str,
) -> Result<Value, ApiFailure> {
    state
        .upstream
        .json(method, path, body, fallback)
        .await
        .map_err(|e| upstream_failure(e, fallback))
}

/// GET /api/plugins
pub async fn list_plugins(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiFailure> {
    forward(&state, Method::GET, "/api/plugins", None, "Failed to fetch plugins")
        .await
        .map(Json)
}

/// POST /api/plugins: 201 with the created plugin.
pub async fn create_plugin(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiFailure> {
    let created = forward(&state, Method::POST, "/api/plugins", Some(&body), "Failed to create plugin").await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// GET /api/plugins/{id}
pub async fn get_plugin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiFailure> {
    let path = format!("/api/plugins/{id}");
    forward(&state, Method::GET, &path, None, "Failed to fetch plugin")
        .await
        .map(Json)
}

/// PUT /api/plugins/{id}
pub async fn update_plugin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    let path = format!("/api/plugins/{id}");
    forward(&state, Method::PUT, &path, Some(&body), "Failed to update plugin")
        .await
        .map(Json)
}

/// DELETE /api/plugins/{id}: 204, no body.
pub async fn delete_plugin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    let path = format!("/api/plugins/{id}");
    forward(&state, Method::DELETE, &path, None, "Failed to delete plugin").await?;
    Ok(StatusCode::NO_CONTENT)
}
