//! Application bootstrap implementation.
//!
//! `TileCacheApp` builds every collaborator the engine needs in a fixed
//! order: store, transport, address source, events, then the engine itself.

use std::sync::Arc;

use tracing::info;

use super::config::AppConfig;
use super::error::AppError;
use crate::address::{TileAddressSource, UrlTemplateSource};
use crate::cache::{DiskTileStore, MemoryTileStore, TileStore};
use crate::config::StoreBackend;
use crate::engine::TileCacheEngine;
use crate::events::{EventSink, FanoutEventSink, TracingEventSink};
use crate::transport::{HttpTransport, TileTransport};

/// A fully wired tile cache.
///
/// # Example
///
/// ```ignore
/// use tilecache::app::{AppConfig, TileCacheApp};
///
/// let app = TileCacheApp::start(AppConfig::default())?;
/// let outcome = app.engine().resolve_tile(&tile).await;
/// ```
pub struct TileCacheApp {
    engine: Arc<TileCacheEngine>,
    store: Arc<dyn TileStore>,
    config: AppConfig,
}

impl TileCacheApp {
    /// Starts the application with tracing-only events.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened, the source template
    /// or cache format is invalid, or the HTTP client cannot be built.
    pub fn start(config: AppConfig) -> Result<Self, AppError> {
        Self::start_with_events(config, Vec::new())
    }

    /// Starts the application, delivering events to `extra` sinks as well as
    /// to the log.
    pub fn start_with_events(
        config: AppConfig,
        extra: Vec<Arc<dyn EventSink>>,
    ) -> Result<Self, AppError> {
        let store = build_store(&config)?;
        let transport: Arc<dyn TileTransport> =
            Arc::new(HttpTransport::with_timeout(config.source.timeout)?);
        let addresses = build_addresses(&config)?;

        let mut events = FanoutEventSink::new(vec![Arc::new(TracingEventSink)]);
        for sink in extra {
            events.push(sink);
        }

        let engine = TileCacheEngine::new(config.cache.clone(), addresses, transport)?
            .with_store(Arc::clone(&store))
            .with_events(Arc::new(events));

        info!(
            backend = %config.backend,
            format = %config.cache.cache_format,
            source = %config.source.url,
            offline = config.cache.use_only_cache,
            "Tile cache started"
        );

        Ok(Self {
            engine: Arc::new(engine),
            store,
            config,
        })
    }

    pub fn engine(&self) -> &Arc<TileCacheEngine> {
        &self.engine
    }

    /// The configured store, even when the engine has caching switched off.
    pub fn store(&self) -> &Arc<dyn TileStore> {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

fn build_store(config: &AppConfig) -> Result<Arc<dyn TileStore>, AppError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryTileStore::new())),
        StoreBackend::Disk => {
            let mut store = DiskTileStore::new(&config.cache_dir)?;
            if config.memory_size > 0 {
                store = store.with_front_cache(config.memory_size as u64);
            }
            info!(dir = %config.cache_dir.display(), "Opened disk tile store");
            Ok(Arc::new(store))
        }
    }
}

fn build_addresses(config: &AppConfig) -> Result<Arc<dyn TileAddressSource>, AppError> {
    let source = UrlTemplateSource::new(config.source.url.clone())?
        .with_subdomains(config.source.subdomains.iter().cloned())
        .with_zoom_range(config.source.min_zoom, config.source.max_zoom)?;
    source.validate()?;
    Ok(Arc::new(source))
}
