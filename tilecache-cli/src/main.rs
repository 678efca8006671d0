//! tilecache CLI - Command-line interface
//!
//! Fetches single tiles through the cache, seeds regions for offline use,
//! and inspects the tile store.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilecache::coord::BoundingBox;

use commands::cache::CacheAction;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilecache")]
#[command(version, about = "Offline-capable map tile cache", long_about = None)]
struct Cli {
    /// Path to config.ini (default: ~/.tilecache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Resolve one tile and write it to a file
    Get {
        /// Zoom level
        z: u8,
        /// Tile column
        x: u32,
        /// Tile row
        y: u32,

        /// Output file (default: <z>_<x>_<y>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Serve only cached tiles, never touch the network
        #[arg(long, conflicts_with = "no_cache")]
        offline: bool,

        /// Bypass the tile store
        #[arg(long)]
        no_cache: bool,
    },

    /// Download every tile covering a region
    Seed {
        /// Region as south,west,north,east in degrees
        #[arg(long, allow_hyphen_values = true)]
        bbox: BoundingBox,

        /// Lowest zoom level to seed
        #[arg(long)]
        min_zoom: u8,

        /// Highest zoom level to seed
        #[arg(long)]
        max_zoom: u8,
    },

    /// Inspect or clear the tile store
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force),
        Commands::Get {
            z,
            x,
            y,
            output,
            offline,
            no_cache,
        } => {
            commands::get::run(
                config_path,
                commands::get::GetArgs {
                    z,
                    x,
                    y,
                    output,
                    offline,
                    no_cache,
                },
            )
            .await
        }
        Commands::Seed {
            bbox,
            min_zoom,
            max_zoom,
        } => commands::seed::run(config_path, bbox, min_zoom, max_zoom).await,
        Commands::Cache { action } => commands::cache::run(config_path, action).await,
    }
}
