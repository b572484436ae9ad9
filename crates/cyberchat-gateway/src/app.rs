use axum::{
    routing::{get, post},
    Router,
};
use cyberchat_core::config::CyberchatConfig;
use cyberchat_core::CyberchatError;
use cyberchat_store::ConversationStore;
use std::sync::Arc;

use crate::http::{conversations, health, plugins, query, stream};
use crate::upstream::UpstreamClient;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: CyberchatConfig,
    pub upstream: UpstreamClient,
    pub store: ConversationStore,
}

impl AppState {
    pub fn new(config: CyberchatConfig, store: ConversationStore) -> Result<Self, CyberchatError> {
        let upstream = UpstreamClient::new(config.upstream.clone())?;
        Ok(Self {
            config,
            upstream,
            store,
        })
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/query", post(query::process_handler))
        .route("/api/query/stream", post(stream::relay_handler))
        .route(
            "/api/plugins",
            get(plugins::list_plugins).post(plugins::create_plugin),
        )
        .route(
            "/api/plugins/{id}",
            get(plugins::get_plugin)
                .put(plugins::update_plugin)
                .delete(plugins::delete_plugin),
        )
        .route(
            "/api/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(conversations::get_conversation)
                .put(conversations::rename_conversation)
                .delete(conversations::delete_conversation),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(conversations::list_messages).post(conversations::add_message),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
