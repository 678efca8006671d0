//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilecache::app::AppError;
use tilecache::cache::StoreError;
use tilecache::config::ConfigFileError;
use tilecache::transport::TransportError;
use tilecache::SeedError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Invalid command-line input
    Usage(String),
    /// Failed to wire up the tile cache
    Startup(AppError),
    /// Tile store operation failed
    Store(StoreError),
    /// Tile could not be fetched and nothing was cached
    Fetch(TransportError),
    /// Offline lookup found nothing
    NotCached(String),
    /// Seed could not start
    Seed(SeedError),
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
    /// Failed to install the Ctrl-C handler
    Signal(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Fetch(_) => {
                eprintln!();
                eprintln!("The tile server could not be reached and no cached copy exists.");
                eprintln!("Check the [source] url in config.ini or retry with --offline.");
            }
            CliError::Seed(SeedError::CacheOnly) => {
                eprintln!();
                eprintln!("Seeding downloads tiles; set use_only_cache = false in config.ini.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Startup(e) => write!(f, "Failed to start tile cache: {}", e),
            CliError::Store(e) => write!(f, "Tile store error: {}", e),
            CliError::Fetch(e) => write!(f, "Failed to fetch tile: {}", e),
            CliError::NotCached(tile) => write!(f, "Tile {} is not cached", tile),
            CliError::Seed(e) => write!(f, "Seed failed: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
            CliError::Signal(msg) => write!(f, "Failed to set signal handler: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Startup(e) => Some(e),
            CliError::Store(e) => Some(e),
            CliError::Fetch(e) => Some(e),
            CliError::Seed(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::Startup(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<SeedError> for CliError {
    fn from(e: SeedError) -> Self {
        CliError::Seed(e)
    }
}
