//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::cache::CacheConfig;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub source: SourceSettings,
    pub logging: LoggingSettings,
}

/// Which [`TileStore`](crate::cache::TileStore) provider to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Disk,
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disk => write!(f, "disk"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disk" => Ok(Self::Disk),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Master switch (`use_cache`)
    pub enabled: bool,
    /// Persist fetched tiles (`save_to_cache`)
    pub save: bool,
    /// Never hit the network (`use_only_cache`)
    pub only_cache: bool,
    /// Codec target format
    pub format: String,
    /// Staleness threshold
    pub max_age: Duration,
    pub backend: StoreBackend,
    /// Disk store root
    pub directory: PathBuf,
    /// Front-cache size in bytes for the disk backend (0 disables it)
    pub memory_size: usize,
}

impl CacheSettings {
    /// The engine options described by this section.
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::builder()
            .use_cache(self.enabled)
            .save_to_cache(self.save)
            .use_only_cache(self.only_cache)
            .cache_format(self.format.clone())
            .cache_max_age(self.max_age)
            .build()
    }
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    /// URL template with `{z}`, `{x}`, `{y}`/`{-y}` and optional `{s}`
    pub url: String,
    pub subdomains: Vec<String>,
    /// HTTP timeout in seconds
    pub timeout: u64,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}
