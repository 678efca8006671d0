//! Application configuration for `TileCacheApp`.
//!
//! `AppConfig` flattens a loaded [`ConfigFile`] into the pieces the bootstrap
//! wires together, and carries the per-invocation overrides the CLI exposes
//! (`--offline`, `--no-cache`).

use std::path::PathBuf;

use crate::config::{CacheConfig, ConfigFile, SourceSettings, StoreBackend};

/// Everything `TileCacheApp::start()` needs.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Engine options.
    pub cache: CacheConfig,

    /// Store provider to build.
    pub backend: StoreBackend,

    /// Root directory for the disk backend.
    pub cache_dir: PathBuf,

    /// Front-cache budget in bytes for the disk backend. 0 disables it.
    pub memory_size: usize,

    /// Tile source.
    pub source: SourceSettings,
}

impl AppConfig {
    /// Builds the application config from a parsed config file.
    pub fn from_config_file(file: &ConfigFile) -> Self {
        Self {
            cache: file.cache.to_cache_config(),
            backend: file.cache.backend,
            cache_dir: file.cache.directory.clone(),
            memory_size: file.cache.memory_size,
            source: file.source.clone(),
        }
    }

    /// Serve only what is already cached.
    pub fn offline(mut self) -> Self {
        self.cache.use_only_cache = true;
        self
    }

    /// Bypass the store entirely.
    pub fn without_cache(mut self) -> Self {
        self.cache.use_cache = false;
        self
    }

    pub fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_config_file(&ConfigFile::default())
    }
}
