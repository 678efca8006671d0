//! Default values for every configuration setting.

use std::path::PathBuf;
use std::time::Duration;

use super::settings::*;

/// Default codec target format.
pub const DEFAULT_CACHE_FORMAT: &str = "image/png";

/// Default staleness threshold (24 hours).
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Default store backend.
pub const DEFAULT_CACHE_BACKEND: StoreBackend = StoreBackend::Disk;

/// Default front-cache size for the disk backend (256 MB).
pub const DEFAULT_MEMORY_CACHE_SIZE: usize = 256 * 1024 * 1024;

/// Default tile URL template (OpenStreetMap standard layer).
pub const DEFAULT_SOURCE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default subdomains substituted for `{s}`.
pub const DEFAULT_SUBDOMAINS: &[&str] = &["a", "b", "c"];

/// Default HTTP timeout in seconds.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = crate::transport::DEFAULT_TIMEOUT_SECS;

/// Default zoom range served by the source.
pub const DEFAULT_SOURCE_MIN_ZOOM: u8 = 0;
pub const DEFAULT_SOURCE_MAX_ZOOM: u8 = 19;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tilecache.log";

/// Name of the directory under `$HOME` holding config, tiles and logs.
pub const CONFIG_DIR_NAME: &str = ".tilecache";

/// Get the path to the config directory (~/.tilecache).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the config file (~/.tilecache/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Default tile store directory (~/.tilecache/tiles).
pub fn default_cache_dir() -> PathBuf {
    config_directory().join("tiles")
}

/// Default log directory (~/.tilecache/logs).
pub fn default_log_dir() -> PathBuf {
    config_directory().join("logs")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            source: SourceSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            save: true,
            only_cache: false,
            format: DEFAULT_CACHE_FORMAT.to_string(),
            max_age: DEFAULT_CACHE_MAX_AGE,
            backend: DEFAULT_CACHE_BACKEND,
            directory: default_cache_dir(),
            memory_size: DEFAULT_MEMORY_CACHE_SIZE,
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            subdomains: DEFAULT_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
            timeout: DEFAULT_SOURCE_TIMEOUT_SECS,
            min_zoom: DEFAULT_SOURCE_MIN_ZOOM,
            max_zoom: DEFAULT_SOURCE_MAX_ZOOM,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}
