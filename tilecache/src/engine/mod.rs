//! Cache-fill decision engine.
//!
//! [`TileCacheEngine::resolve`] turns a tile key into display-ready data using
//! stale-while-revalidate with fallback:
//!
//! ```text
//!                       ┌─────────────┐
//!  resolve(key) ──────► │ store.get   │
//!                       └──────┬──────┘
//!              NotFound        │        Found
//!         ┌────────────────────┴──────────────────────┐
//!         ▼                                           ▼
//!   only_cache? ─► Empty                  fresh or only_cache? ─► stored blob
//!         │                                           │
//!         ▼                                           ▼
//!   fetch ─► encode ─► put ─► Fresh        fetch ─► encode ─► put new, delete old
//!     │                                      │
//!     └─► Failed(err)                        └─► stored blob (stale fallback)
//! ```
//!
//! Only a first-ever fetch that fails reaches the caller as an error. Every
//! other failure is absorbed, logged, and reported as a `tilecacheerror`
//! event.

mod clock;
mod coalesce;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coalesce::{CoalescerStats, RequestCoalescer, Shared};

use std::sync::Arc;

use tracing::{debug, warn};

use crate::address::TileAddressSource;
use crate::cache::{Revision, TileRecord, TileStore};
use crate::codec::{codec_for_format, CodecError, TileBlob, TileCodec};
use crate::config::CacheConfig;
use crate::coord::TileCoord;
use crate::events::{EventSink, NoopEventSink, TileCacheEvent};
use crate::transport::{TileTransport, TransportError};

/// What a resolution produced for the display surface.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    /// Usable tile data (freshly fetched, cached, or a stale fallback).
    Fresh(TileBlob),
    /// No data is available and the network may not be used.
    Empty,
    /// The first fetch of a key failed and nothing was cached.
    Failed(TransportError),
}

impl TileOutcome {
    pub fn blob(&self) -> Option<&TileBlob> {
        match self {
            Self::Fresh(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn into_blob(self) -> Option<TileBlob> {
        match self {
            Self::Fresh(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

/// Result of one fetch/encode/store cycle, shared between coalesced callers.
#[derive(Debug, Clone)]
pub(crate) struct FetchedTile {
    /// Encoded blob, or raw bytes if encoding failed.
    pub blob: TileBlob,
    /// Whether the blob was written to the store.
    pub persisted: bool,
}

pub(crate) type FetchResult = Result<FetchedTile, TransportError>;

/// Resolves tile keys against the store, the transport and the codec.
pub struct TileCacheEngine {
    config: CacheConfig,
    addresses: Arc<dyn TileAddressSource>,
    transport: Arc<dyn TileTransport>,
    codec: Arc<dyn TileCodec>,
    store: Option<Arc<dyn TileStore>>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    coalescer: RequestCoalescer<FetchResult>,
    /// Held for the duration of a seed.
    pub(crate) seed_lock: tokio::sync::Mutex<()>,
}

impl TileCacheEngine {
    /// Creates an engine with no store, no event listener and the system clock.
    ///
    /// The codec is chosen from `config.cache_format`.
    pub fn new(
        config: CacheConfig,
        addresses: Arc<dyn TileAddressSource>,
        transport: Arc<dyn TileTransport>,
    ) -> Result<Self, CodecError> {
        let codec = codec_for_format(&config.cache_format)?;
        Ok(Self {
            config,
            addresses,
            transport,
            codec,
            store: None,
            events: Arc::new(NoopEventSink),
            clock: Arc::new(SystemClock),
            coalescer: RequestCoalescer::new(),
            seed_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn TileStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides the codec derived from `cache_format`.
    pub fn with_codec(mut self, codec: Arc<dyn TileCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn addresses(&self) -> &Arc<dyn TileAddressSource> {
        &self.addresses
    }

    pub fn store(&self) -> Option<&Arc<dyn TileStore>> {
        self.store.as_ref()
    }

    pub fn coalescer_stats(&self) -> CoalescerStats {
        self.coalescer.stats()
    }

    /// Keys with a fetch currently in progress.
    pub fn in_flight_count(&self) -> usize {
        self.coalescer.in_flight_count()
    }

    /// The store to use, or `None` when caching is switched off.
    pub(crate) fn active_store(&self) -> Option<&Arc<dyn TileStore>> {
        if self.config.use_cache {
            self.store.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn emit(&self, event: TileCacheEvent) {
        self.events.emit(event);
    }

    /// Addresses `tile` and resolves it.
    pub async fn resolve_tile(&self, tile: &TileCoord) -> TileOutcome {
        let key = self.addresses.address(tile);
        self.resolve(&key).await
    }

    /// Resolves one tile key.
    pub async fn resolve(&self, key: &str) -> TileOutcome {
        let Some(store) = self.active_store() else {
            return self.passthrough(key).await;
        };

        let existing = match store.get(key).await {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %key, error = %e, "Store lookup failed, treating as miss");
                self.emit(TileCacheEvent::error(key, &e));
                None
            }
        };

        match existing {
            None => self.resolve_miss(key).await,
            Some(record) => self.resolve_hit(key, record).await,
        }
    }

    async fn resolve_miss(&self, key: &str) -> TileOutcome {
        self.emit(TileCacheEvent::CacheMiss {
            key: key.to_string(),
        });

        if self.config.use_only_cache {
            return TileOutcome::Empty;
        }

        match self
            .fetch_shared(key, None, self.config.save_to_cache)
            .await
        {
            Ok(shared) => TileOutcome::Fresh(shared.value.blob),
            Err(e) => {
                debug!(key = %key, error = %e, "Fetch failed with nothing cached");
                TileOutcome::Failed(e)
            }
        }
    }

    async fn resolve_hit(&self, key: &str, record: TileRecord) -> TileOutcome {
        self.emit(TileCacheEvent::CacheHit {
            key: key.to_string(),
        });

        if self.config.use_only_cache || self.is_fresh(&record) {
            return TileOutcome::Fresh(record.blob);
        }

        debug!(key = %key, revision = %record.revision, "Refreshing stale tile");
        match self
            .fetch_shared(key, Some(record.revision.clone()), self.config.save_to_cache)
            .await
        {
            Ok(shared) => TileOutcome::Fresh(shared.value.blob),
            Err(e) => {
                warn!(key = %key, error = %e, "Refresh failed, serving stale tile");
                self.emit(TileCacheEvent::error(key, &e));
                TileOutcome::Fresh(record.blob)
            }
        }
    }

    fn is_fresh(&self, record: &TileRecord) -> bool {
        let age = record.age(self.clock.now()).to_std().unwrap_or_default();
        age <= self.config.cache_max_age
    }

    async fn passthrough(&self, key: &str) -> TileOutcome {
        match self.transport.fetch(key).await {
            Ok(bytes) => TileOutcome::Fresh(TileBlob::raw(bytes)),
            Err(e) => TileOutcome::Failed(e),
        }
    }

    /// Fetches, encodes and optionally stores `key`, sharing the work with
    /// any concurrent caller for the same key.
    ///
    /// `previous` is the revision this fetch supersedes; it is deleted once the
    /// new revision is stored.
    pub(crate) async fn fetch_shared(
        &self,
        key: &str,
        previous: Option<Revision>,
        persist: bool,
    ) -> Result<Shared<FetchedTile>, TransportError> {
        let shared = self
            .coalescer
            .run(key, || self.fetch_encode_store(key, previous, persist))
            .await
            .ok_or(TransportError::Interrupted)?;

        let leader = shared.leader;
        shared.value.map(|value| Shared { value, leader })
    }

    async fn fetch_encode_store(
        &self,
        key: &str,
        previous: Option<Revision>,
        persist: bool,
    ) -> FetchResult {
        let raw = self.transport.fetch(key).await?;

        let blob = match self.encode(raw.clone()).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!(key = %key, error = %e, "Encoding failed, returning raw bytes");
                self.emit(TileCacheEvent::error(key, &e));
                return Ok(FetchedTile {
                    blob: TileBlob::raw(raw),
                    persisted: false,
                });
            }
        };

        let persisted = persist && self.persist(key, &blob, previous.as_ref()).await;
        Ok(FetchedTile { blob, persisted })
    }

    /// Runs the codec on the blocking pool.
    async fn encode(&self, raw: bytes::Bytes) -> Result<TileBlob, CodecError> {
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || codec.encode(&raw))
            .await
            .map_err(|e| CodecError::Encode {
                format: self.config.cache_format.clone(),
                reason: e.to_string(),
            })?
    }

    /// Writes `blob` as a new revision, then removes every older one.
    ///
    /// Returns whether the new revision was stored. Failures are logged and
    /// emitted, never returned.
    pub(crate) async fn persist(
        &self,
        key: &str,
        blob: &TileBlob,
        previous: Option<&Revision>,
    ) -> bool {
        let Some(store) = self.store.as_ref() else {
            return false;
        };

        let revision = match store.put(key, blob.clone(), self.clock.now()).await {
            Ok(revision) => revision,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to store tile");
                self.emit(TileCacheEvent::error(key, &e));
                return false;
            }
        };

        for old in self.superseded(store, key, &revision, previous).await {
            if let Err(e) = store.delete(key, &old).await {
                warn!(key = %key, revision = %old, error = %e, "Failed to delete superseded revision");
                self.emit(TileCacheEvent::error(key, &e));
            }
        }

        debug!(key = %key, revision = %revision, "Tile stored");
        true
    }

    /// Every live revision older than `current`.
    ///
    /// Includes records `get` could not read, so a corrupt newest file does
    /// not outlive the tile that replaced it. Falls back to `previous` when
    /// the store cannot list.
    async fn superseded(
        &self,
        store: &Arc<dyn TileStore>,
        key: &str,
        current: &Revision,
        previous: Option<&Revision>,
    ) -> Vec<Revision> {
        match store.revisions(key).await {
            Ok(live) => live.into_iter().filter(|rev| rev < current).collect(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to list revisions");
                previous
                    .filter(|old| *old != current)
                    .cloned()
                    .into_iter()
                    .collect()
            }
        }
    }
}
