//! CLI runner for common setup.
//!
//! Encapsulates config loading, logging initialization and application
//! startup so command handlers stay small.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tilecache::app::{AppConfig, TileCacheApp};
use tilecache::config::{config_file_path, ConfigFile};
use tilecache::events::EventSink;
use tilecache::logging::{init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps the log file writer alive while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Load config (defaults if the file is missing) and initialize logging.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let logging_guard = init_logging(&config.logging.directory, &config.logging.file)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tilecache v{}", tilecache::VERSION);
        info!(config = %self.config_path.display(), "tilecache CLI: {} command", command);
    }

    /// Application config derived from the loaded file.
    pub fn app_config(&self) -> AppConfig {
        AppConfig::from_config_file(&self.config)
    }

    /// Start the tile cache with optional extra event sinks.
    pub fn start(
        &self,
        config: AppConfig,
        sinks: Vec<Arc<dyn EventSink>>,
    ) -> Result<TileCacheApp, CliError> {
        TileCacheApp::start_with_events(config, sinks).map_err(CliError::Startup)
    }
}
