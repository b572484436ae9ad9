mod cli;
mod client;
mod commands;
mod terminal;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use cyberchat_core::config::CyberchatConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the transcript; logs go to stderr
    let default_filter = if cli.verbose {
        "cyberchat_cli=debug,cyberchat_transcript=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config_path = cli.config.clone().or_else(|| std::env::var("CYBERCHAT_CONFIG").ok());
    let mut config = CyberchatConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        CyberchatConfig::default()
    });
    if let Some(url) = cli.gateway {
        config.client.gateway_url = url;
    }

    let client = client::GatewayClient::new(&config.client.gateway_url)?;
    match cli.command {
        Commands::Chat(args) => commands::chat::run(&client, &config.client, args).await,
        Commands::Plugins => commands::plugins::run(&client).await,
    }
}
