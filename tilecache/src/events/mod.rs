//! Lifecycle notifications.
//!
//! The engine and the seed driver push [`TileCacheEvent`]s into an
//! [`EventSink`]. Sinks only observe: nothing the core does depends on whether
//! an event was delivered, and `emit` must never block.
//!
//! # Architecture
//!
//! ```text
//! TileCacheEngine ──┐
//!                   ├──► Arc<dyn EventSink> ──► TracingEventSink  (logs)
//! SeedDriver ───────┘                      ├──► ChannelEventSink  (CLI progress)
//!                                          └──► FanoutEventSink   (both)
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::coord::BoundingBox;

/// Region and size of a running seed, repeated in every seed event.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedInfo {
    pub bbox: BoundingBox,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub queue_length: usize,
}

/// Something observable happened in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum TileCacheEvent {
    /// A stored record was found (fresh or stale).
    CacheHit { key: String },

    /// No stored record existed.
    CacheMiss { key: String },

    /// A failure was absorbed by a fallback.
    CacheError { key: String, error: String },

    SeedStart { info: SeedInfo },

    /// One queue item was processed or skipped.
    SeedProgress {
        info: SeedInfo,
        remaining_length: usize,
    },

    /// The seed finished, whether by exhausting the queue or by cancellation.
    SeedEnd {
        info: SeedInfo,
        fetched: usize,
        skipped: usize,
        failed: usize,
        cancelled: bool,
    },
}

impl TileCacheEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CacheHit { .. } => "tilecachehit",
            Self::CacheMiss { .. } => "tilecachemiss",
            Self::CacheError { .. } => "tilecacheerror",
            Self::SeedStart { .. } => "seedstart",
            Self::SeedProgress { .. } => "seedprogress",
            Self::SeedEnd { .. } => "seedend",
        }
    }

    pub(crate) fn error(key: &str, error: impl fmt::Display) -> Self {
        Self::CacheError {
            key: key.to_string(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for TileCacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives lifecycle events.
///
/// Implementations must return promptly and must not panic.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TileCacheEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: TileCacheEvent) {}
}

/// Writes events to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: TileCacheEvent) {
        match &event {
            TileCacheEvent::CacheHit { key } | TileCacheEvent::CacheMiss { key } => {
                debug!(event = event.name(), key = %key, "Tile cache lookup");
            }
            TileCacheEvent::CacheError { key, error } => {
                warn!(event = event.name(), key = %key, error = %error, "Tile cache error");
            }
            TileCacheEvent::SeedStart { info } => {
                info!(
                    bbox = %info.bbox,
                    min_zoom = info.min_zoom,
                    max_zoom = info.max_zoom,
                    queue_length = info.queue_length,
                    "Seed started"
                );
            }
            TileCacheEvent::SeedProgress {
                info,
                remaining_length,
            } => {
                debug!(
                    remaining = remaining_length,
                    queue_length = info.queue_length,
                    "Seed progress"
                );
            }
            TileCacheEvent::SeedEnd {
                info,
                fetched,
                skipped,
                failed,
                cancelled,
            } => {
                info!(
                    bbox = %info.bbox,
                    queue_length = info.queue_length,
                    fetched,
                    skipped,
                    failed,
                    cancelled,
                    "Seed finished"
                );
            }
        }
    }
}

/// Forwards events into an unbounded channel.
///
/// Sends after the receiver is dropped are silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<TileCacheEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TileCacheEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: TileCacheEvent) {
        let _ = self.tx.send(event);
    }
}

/// Keeps every event in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<TileCacheEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TileCacheEvent> {
        self.events.lock().clone()
    }

    /// Wire names in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(TileCacheEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: TileCacheEvent) {
        self.events.lock().push(event);
    }
}

/// Delivers each event to several sinks in order.
#[derive(Default)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: TileCacheEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}
