use anyhow::Result;

use crate::client::GatewayClient;

/// `cyberchat plugins`
pub async fn run(client: &GatewayClient) -> Result<()> {
    let plugins = client.plugins().await?;
    if plugins.is_empty() {
        println!("No plugins registered.");
        return Ok(());
    }

    let width = plugins.iter().map(|p| p.name.len()).max().unwrap_or(4).max(4);
    println!("{:>4}  {:<width$}  DESCRIPTION", "ID", "NAME");
    for plugin in &plugins {
        let key = if plugin.api_key_required { " [key]" } else { "" };
        println!(
            "{:>4}  {:<width$}  {}{}",
            plugin.id, plugin.name, plugin.description, key
        );
    }
    Ok(())
}
