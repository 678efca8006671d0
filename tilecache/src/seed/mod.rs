//! Region seeding.
//!
//! [`SeedDriver`] makes sure every tile covering a bounding box across a zoom
//! range has a stored record. Tiles are processed strictly one at a time so a
//! seed never has more than one request outstanding against the tile server.
//!
//! ```text
//! bbox + zooms ──► tiles_in_region ──► address ──► SeedJob.queue
//!                                                      │
//!          ┌───────────────────────────────────────────┘
//!          ▼
//!   cancelled? ──yes──► seedend (cancelled)
//!          │
//!          ▼
//!   store.get ──found──► skip ─────────────┐
//!          │                               │
//!          ▼                               ▼
//!   fetch ► encode ► put  ──────────► seedprogress ──► next
//! ```
//!
//! Failures are counted and the queue advances; there are no retries. Only
//! one seed may run per engine at a time; a second call is rejected.

use std::collections::VecDeque;
use std::ops::RangeInclusive;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::{BoundingBox, CoordError};
use crate::engine::TileCacheEngine;
use crate::events::{SeedInfo, TileCacheEvent};

/// Reasons a seed could not start.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeedError {
    /// Seeding needs the network, which cache-only mode forbids.
    #[error("Cannot seed in cache-only mode")]
    CacheOnly,

    /// Another seed is running on this engine.
    #[error("A seed is already running")]
    AlreadyRunning,

    /// The region could not be enumerated.
    #[error("Invalid seed region: {0}")]
    Region(#[from] CoordError),
}

/// Counts for a finished seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Keys in the queue when the seed started.
    pub queue_length: usize,
    /// Tiles fetched and stored.
    pub fetched: usize,
    /// Tiles that already had a record.
    pub skipped: usize,
    /// Tiles whose fetch, encode or store failed.
    pub failed: usize,
    /// Whether the seed stopped before draining the queue.
    pub cancelled: bool,
}

impl SeedReport {
    /// Items taken off the queue.
    pub fn processed(&self) -> usize {
        self.fetched + self.skipped + self.failed
    }
}

/// Work for one seed invocation. Lives only for the duration of the seed.
#[derive(Debug)]
pub struct SeedJob {
    pub bbox: BoundingBox,
    pub zoom_range: RangeInclusive<u8>,
    pub queue: VecDeque<String>,
    pub total: usize,
}

impl SeedJob {
    /// Enumerates and addresses every tile in the region.
    ///
    /// Order is zoom ascending, then row north to south, then column west to
    /// east.
    pub fn build(
        engine: &TileCacheEngine,
        bbox: BoundingBox,
        zoom_range: RangeInclusive<u8>,
    ) -> Result<Self, CoordError> {
        let addresses = engine.addresses();
        let queue: VecDeque<String> = addresses
            .tiles_in_region(&bbox, zoom_range.clone())?
            .iter()
            .map(|tile| addresses.address(tile))
            .collect();

        Ok(Self {
            bbox,
            total: queue.len(),
            zoom_range,
            queue,
        })
    }

    fn info(&self) -> SeedInfo {
        SeedInfo {
            bbox: self.bbox,
            min_zoom: *self.zoom_range.start(),
            max_zoom: *self.zoom_range.end(),
            queue_length: self.total,
        }
    }
}

enum ItemResult {
    Fetched,
    Skipped,
    Failed,
}

/// Serial batch driver over one engine.
pub struct SeedDriver<'a> {
    engine: &'a TileCacheEngine,
}

impl<'a> SeedDriver<'a> {
    pub fn new(engine: &'a TileCacheEngine) -> Self {
        Self { engine }
    }

    /// Seeds every tile covering `bbox` for zooms `min_zoom..=max_zoom`.
    ///
    /// Returns `Ok(None)` without emitting anything when caching is disabled
    /// or the zoom range is empty.
    pub async fn seed(
        &self,
        bbox: BoundingBox,
        min_zoom: u8,
        max_zoom: u8,
        cancel: &CancellationToken,
    ) -> Result<Option<SeedReport>, SeedError> {
        if self.engine.active_store().is_none() || min_zoom > max_zoom {
            debug!(min_zoom, max_zoom, "Nothing to seed");
            return Ok(None);
        }
        if self.engine.config().use_only_cache {
            return Err(SeedError::CacheOnly);
        }

        let _running = self
            .engine
            .seed_lock
            .try_lock()
            .map_err(|_| SeedError::AlreadyRunning)?;

        let mut job = SeedJob::build(self.engine, bbox, min_zoom..=max_zoom)?;
        let info = job.info();
        let mut report = SeedReport {
            queue_length: job.total,
            ..SeedReport::default()
        };

        info!(bbox = %bbox, min_zoom, max_zoom, queue_length = job.total, "Starting seed");
        self.engine
            .emit(TileCacheEvent::SeedStart { info: info.clone() });

        while let Some(key) = job.queue.front().cloned() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                info!(remaining = job.queue.len(), "Seed cancelled");
                break;
            }

            match self.process(&key).await {
                ItemResult::Fetched => report.fetched += 1,
                ItemResult::Skipped => report.skipped += 1,
                ItemResult::Failed => report.failed += 1,
            }
            job.queue.pop_front();

            self.engine.emit(TileCacheEvent::SeedProgress {
                info: info.clone(),
                remaining_length: job.queue.len(),
            });
        }

        self.engine.emit(TileCacheEvent::SeedEnd {
            info,
            fetched: report.fetched,
            skipped: report.skipped,
            failed: report.failed,
            cancelled: report.cancelled,
        });

        Ok(Some(report))
    }

    async fn process(&self, key: &str) -> ItemResult {
        let Some(store) = self.engine.active_store() else {
            return ItemResult::Failed;
        };

        match store.get(key).await {
            Ok(Some(_)) => return ItemResult::Skipped,
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Store lookup failed during seed, fetching anyway");
                self.engine.emit(TileCacheEvent::error(key, &e));
            }
        }

        let shared = match self.engine.fetch_shared(key, None, true).await {
            Ok(shared) => shared,
            Err(e) => {
                warn!(key = %key, error = %e, "Seed fetch failed");
                self.engine.emit(TileCacheEvent::error(key, &e));
                return ItemResult::Failed;
            }
        };

        let tile = shared.value;
        if tile.blob.is_raw() {
            // Encoding failed; the error was reported by whoever ran the fetch
            ItemResult::Failed
        } else if tile.persisted {
            ItemResult::Fetched
        } else if shared.leader {
            ItemResult::Failed
        } else if self.engine.persist(key, &tile.blob, None).await {
            // Joined a fetch that was not stored
            ItemResult::Fetched
        } else {
            ItemResult::Failed
        }
    }
}

impl TileCacheEngine {
    /// Seeds a region through a [`SeedDriver`] on this engine.
    pub async fn seed(
        &self,
        bbox: BoundingBox,
        min_zoom: u8,
        max_zoom: u8,
        cancel: &CancellationToken,
    ) -> Result<Option<SeedReport>, SeedError> {
        SeedDriver::new(self)
            .seed(bbox, min_zoom, max_zoom, cancel)
            .await
    }
}
