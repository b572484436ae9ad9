pub mod conversations;
pub mod health;
pub mod plugins;
pub mod query;
pub mod stream;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use cyberchat_core::types::ApiError;
use cyberchat_core::CyberchatError;
use serde_json::Value;

/// Error half of every handler's return type: a status plus `{"error": …}`.
pub type ApiFailure = (StatusCode, Json<ApiError>);

pub(crate) fn failure(status: StatusCode, message: impl Into<String>) -> ApiFailure {
    (status, Json(ApiError::new(message)))
}

/// Map an upstream call error for a proxied route.
///
/// Upstream rejections keep their status and message; anything else
/// (unreachable, broken body, bad JSON) is a 500 with `fallback`.
pub(crate) fn upstream_failure(err: CyberchatError, fallback: &str) -> ApiFailure {
    match err {
        CyberchatError::UpstreamStatus { status, message } => failure(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            message,
        ),
        other => {
            tracing::warn!(code = other.code(), error = %other, "{fallback}");
            failure(StatusCode::INTERNAL_SERVER_ERROR, fallback)
        }
    }
}

/// Unwrap a query body that is forwarded to the upstream as sent.
///
/// The payload is not re-serialized, so fields this gateway does not know
/// reach the upstream untouched. A body that is not JSON gets the route's
/// `{"error": fallback}` 500 rather than axum's plain-text rejection.
pub(crate) fn query_payload(
    payload: Result<Json<Value>, JsonRejection>,
    fallback: &str,
) -> Result<Value, ApiFailure> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "{fallback}");
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, fallback))
        }
    }
}
