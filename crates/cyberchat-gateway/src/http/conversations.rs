//! Conversation history routes, backed by the local SQLite store.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cyberchat_core::types::Role;
use cyberchat_store::{Conversation, Message, NewMessage, StoreError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use super::{failure, ApiFailure};
use crate::app::AppState;

#[derive(Deserialize)]
pub struct CreateConversation {
    pub title: String,
    /// First user message; a conversation may also start empty.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct RenameConversation {
    pub title: String,
}

/// Map a store error; `action` completes "Failed to …" for the 500 case.
fn store_failure(err: StoreError, action: &str) -> ApiFailure {
    match err {
        StoreError::NotFound { .. } => failure(StatusCode::NOT_FOUND, "Conversation not found"),
        StoreError::InvalidRole(role) => failure(
            StatusCode::BAD_REQUEST,
            format!("Invalid role: {role} (expected user, assistant or system)"),
        ),
        StoreError::Database(e) => {
            warn!(error = %e, "failed to {action}");
            failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {action}"))
        }
    }
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Conversation>>, ApiFailure> {
    state
        .store
        .list()
        .map(Json)
        .map_err(|e| store_failure(e, "fetch conversations"))
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateConversation>,
) -> Result<(StatusCode, Json<Conversation>), ApiFailure> {
    let initial = req.message.map(|m| NewMessage::new(Role::User, m));
    state
        .store
        .create(&req.title, initial)
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(|e| store_failure(e, "create conversation"))
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiFailure> {
    state
        .store
        .get(&id)
        .map(Json)
        .map_err(|e| store_failure(e, "fetch conversation"))
}

/// PUT /api/conversations/{id}
pub async fn rename_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameConversation>,
) -> Result<Json<Conversation>, ApiFailure> {
    state
        .store
        .rename(&id, &req.title)
        .map(Json)
        .map_err(|e| store_failure(e, "update conversation"))
}

/// DELETE /api/conversations/{id}
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    state
        .store
        .delete(&id)
        .map(|()| Json(json!({ "success": true })))
        .map_err(|e| store_failure(e, "delete conversation"))
}

/// GET /api/conversations/{id}/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiFailure> {
    state
        .store
        .messages(&id)
        .map(Json)
        .map_err(|e| store_failure(e, "fetch messages"))
}

/// POST /api/conversations/{id}/messages
pub async fn add_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(msg): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), ApiFailure> {
    state
        .store
        .add_message(&id, msg)
        .map(|m| (StatusCode::CREATED, Json(m)))
        .map_err(|e| store_failure(e, "add message"))
}
