use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::config::StaticConfig;
use crate::runtime::lifetime::startup::build_link_service;

/// Delete expired links once and exit.
pub async fn run_reap(config: &StaticConfig) -> Result<()> {
    let links = build_link_service(config).await?;
    let removed = links
        .reap_expired()
        .await
        .context("Failed to delete expired links")?;

    info!("Reap finished: {} expired links removed", removed);
    println!(
        "{} removed {} expired link(s)",
        "✓".green().bold(),
        removed.to_string().cyan()
    );
    Ok(())
}
