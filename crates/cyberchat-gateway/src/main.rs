use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use cyberchat_core::config::CyberchatConfig;
use cyberchat_gateway::{build_router, AppState};
use cyberchat_store::ConversationStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cyberchat_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: CYBERCHAT_CONFIG env > ~/.cyberchat/cyberchat.toml
    let config_path = std::env::var("CYBERCHAT_CONFIG").ok();
    let config = CyberchatConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        CyberchatConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    cyberchat_store::db::init_db(&db)?;
    info!("database migrations complete");

    let store = ConversationStore::new(db);
    let state = Arc::new(AppState::new(config, store)?);
    info!(upstream = %state.upstream.base_url(), "upstream configured");
    let router = build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Cyberchat gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
