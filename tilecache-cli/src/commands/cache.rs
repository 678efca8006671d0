//! Cache management CLI commands.

use std::path::Path;

use clap::Subcommand;
use tilecache::app::AppConfig;
use tilecache::config::{format_size, StoreBackend};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear the tile store, removing every revision
    Clear,
    /// Show tile store statistics
    Stats,
}

/// Run a cache subcommand.
pub async fn run(config_path: Option<&Path>, action: CacheAction) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("cache");

    let app = runner.start(runner.app_config(), Vec::new())?;
    let location = describe_store(app.config());

    match action {
        CacheAction::Clear => {
            println!("Clearing tile store: {}", location);
            let removed = app.store().clear().await?;
            println!(
                "Deleted {} tiles, freed {}",
                removed.entries,
                format_size(removed.bytes as usize)
            );
        }
        CacheAction::Stats => {
            let stats = app.store().stats().await?;
            println!("Tile store: {}", location);
            println!("  Tiles: {}", stats.entries);
            println!("  Size:  {}", format_size(stats.bytes as usize));
        }
    }
    Ok(())
}

fn describe_store(config: &AppConfig) -> String {
    match config.backend {
        StoreBackend::Disk => config.cache_dir.display().to_string(),
        StoreBackend::Memory => "in-memory (not persisted between runs)".to_string(),
    }
}
