//! Integration tests for resolving and seeding through the public API.
//!
//! These tests drive the engine end to end with a scripted transport:
//! - stale-while-revalidate across a clock advance
//! - region seeding with progress events
//! - persistence of the disk store across reopen
//!
//! Run with: `cargo test --test tile_cache_integration`

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use tilecache::address::UrlTemplateSource;
use tilecache::cache::{BoxFuture, DiskTileStore, MemoryTileStore, TileStore};
use tilecache::codec::{PassthroughCodec, TileBlob};
use tilecache::config::CacheConfig;
use tilecache::coord::{BoundingBox, TileCoord};
use tilecache::engine::{ManualClock, TileCacheEngine, TileOutcome};
use tilecache::events::{RecordingEventSink, TileCacheEvent};
use tilecache::transport::{TileTransport, TransportError};

// ============================================================================
// Helpers
// ============================================================================

const TEMPLATE: &str = "http://tiles.test/{z}/{x}/{y}.png";

/// A 2x2 PNG, so the codec accepts the body and the engine stores it.
fn tile_png() -> Bytes {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([30, 90, 160, 255]));
    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    Bytes::from(buffer)
}

/// Record files under a disk store root.
fn tile_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(tile_files(&path));
        } else if path.extension().is_some_and(|e| e == "tile") {
            files.push(path);
        }
    }
    files
}

/// Transport that returns a fixed body until switched to failing.
struct ScriptedTransport {
    body: Bytes,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(body: Bytes) -> Self {
        Self {
            body,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TileTransport for ScriptedTransport {
    fn fetch(&self, key: &str) -> BoxFuture<'_, Result<Bytes, TransportError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(TransportError::Status {
                    status: 503,
                    url: key,
                })
            } else {
                Ok(self.body.clone())
            }
        })
    }
}

struct Setup {
    engine: TileCacheEngine,
    transport: Arc<ScriptedTransport>,
    events: Arc<RecordingEventSink>,
    clock: Arc<ManualClock>,
}

fn setup(config: CacheConfig, store: Arc<dyn TileStore>) -> Setup {
    let transport = Arc::new(ScriptedTransport::new(tile_png()));
    let events = Arc::new(RecordingEventSink::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let addresses = Arc::new(UrlTemplateSource::new(TEMPLATE).unwrap());

    let engine = TileCacheEngine::new(config, addresses, transport.clone())
        .unwrap()
        .with_codec(Arc::new(PassthroughCodec))
        .with_store(store)
        .with_events(events.clone())
        .with_clock(clock.clone());

    Setup {
        engine,
        transport,
        events,
        clock,
    }
}

fn one_second_config() -> CacheConfig {
    CacheConfig::builder()
        .cache_max_age(Duration::from_millis(1000))
        .build()
}

/// Covers 4 tiles at zoom 2 (rows and cols 1-2) and 9 at zoom 3 (rows and cols 3-5).
fn region() -> BoundingBox {
    BoundingBox::new(-50.0, -10.0, 10.0, 50.0).unwrap()
}

// ============================================================================
// Stale-while-revalidate
// ============================================================================

#[tokio::test]
async fn test_stale_fallback_scenario() {
    let store = Arc::new(MemoryTileStore::new());
    let s = setup(one_second_config(), store.clone());

    let first = s.engine.resolve("A").await;
    let blob = first.blob().cloned().expect("first resolve fetches");
    assert_eq!(blob.data, tile_png());
    assert_eq!(blob.content_type, "image/png");
    assert_eq!(store.revisions("A").await.unwrap().len(), 1);
    assert_eq!(s.transport.calls(), 1);

    let second = s.engine.resolve("A").await;
    assert_eq!(second.blob(), Some(&blob));
    assert_eq!(s.transport.calls(), 1);

    s.clock.advance(Duration::from_millis(1500));
    s.transport.fail();

    let third = s.engine.resolve("A").await;
    assert_eq!(third.blob(), Some(&blob));
    assert_eq!(s.transport.calls(), 2);
    assert_eq!(store.revisions("A").await.unwrap().len(), 1);
    assert_eq!(s.events.count("tilecacheerror"), 1);
}

#[tokio::test]
async fn test_stale_refresh_replaces_revision() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(DiskTileStore::new(temp.path()).unwrap());
    let s = setup(one_second_config(), store.clone());

    s.engine.resolve("A").await;
    let before = store.get("A").await.unwrap().unwrap();

    s.clock.advance(Duration::from_millis(1500));
    let outcome = s.engine.resolve("A").await;
    assert!(outcome.is_fresh());

    let revisions = store.revisions("A").await.unwrap();
    assert_eq!(revisions.len(), 1);
    let after = store.get("A").await.unwrap().unwrap();
    assert!(after.timestamp > before.timestamp);
    assert!(after.revision > before.revision);
}

#[tokio::test]
async fn test_offline_miss_is_empty_without_network() {
    let config = CacheConfig::builder().use_only_cache(true).build();
    let s = setup(config, Arc::new(MemoryTileStore::new()));

    let outcome = s.engine.resolve_tile(&TileCoord::new(1, 1, 2)).await;

    assert!(matches!(outcome, TileOutcome::Empty));
    assert_eq!(s.transport.calls(), 0);
    assert_eq!(s.events.names(), vec!["tilecachemiss"]);
}

#[tokio::test]
async fn test_disk_store_survives_reopen() {
    let temp = TempDir::new().unwrap();

    {
        let store = Arc::new(DiskTileStore::new(temp.path()).unwrap());
        let s = setup(CacheConfig::default(), store);
        assert!(s.engine.resolve("A").await.is_fresh());
    }

    let reopened = Arc::new(DiskTileStore::new(temp.path()).unwrap());
    let config = CacheConfig::builder().use_only_cache(true).build();
    let s = setup(config, reopened);

    let outcome = s.engine.resolve("A").await;
    assert_eq!(outcome.blob().map(|b| b.data.clone()), Some(tile_png()));
    assert_eq!(s.transport.calls(), 0);
}

#[tokio::test]
async fn test_corrupt_record_is_replaced_on_miss() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(DiskTileStore::new(temp.path()).unwrap());
    store
        .put("A", TileBlob::new("image/png", tile_png()), Utc::now())
        .await
        .unwrap();

    let files = tile_files(temp.path());
    assert_eq!(files.len(), 1);
    std::fs::write(&files[0], b"garbage").unwrap();
    assert!(store.get("A").await.is_err());

    let s = setup(CacheConfig::default(), store.clone());
    let outcome = s.engine.resolve("A").await;

    assert!(outcome.is_fresh());
    assert_eq!(s.transport.calls(), 1);
    let revisions = store.revisions("A").await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].seq, 2);
    assert_eq!(tile_files(temp.path()).len(), 1);
    let record = store.get("A").await.unwrap().unwrap();
    assert_eq!(record.blob.data, tile_png());
}

// ============================================================================
// Seeding
// ============================================================================

#[tokio::test]
async fn test_seed_scenario() {
    let store = Arc::new(MemoryTileStore::new());
    let s = setup(CacheConfig::default(), store.clone());

    let report = s
        .engine
        .seed(region(), 2, 3, &CancellationToken::new())
        .await
        .unwrap()
        .expect("seed runs");

    assert_eq!(s.transport.calls(), 13);
    assert_eq!(report.fetched, 13);
    assert_eq!(store.len(), 13);

    let events = s.events.events();
    match events.first() {
        Some(TileCacheEvent::SeedStart { info }) => assert_eq!(info.queue_length, 13),
        other => panic!("expected seedstart, got {other:?}"),
    }
    let remaining: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            TileCacheEvent::SeedProgress {
                remaining_length, ..
            } => Some(*remaining_length),
            _ => None,
        })
        .collect();
    assert!(remaining.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(remaining.last(), Some(&0));
    assert_eq!(s.events.names().last(), Some(&"seedend"));
    assert_eq!(s.events.count("seedend"), 1);
}

#[tokio::test]
async fn test_seed_inverted_zoom_range_is_noop() {
    let s = setup(CacheConfig::default(), Arc::new(MemoryTileStore::new()));

    let report = s
        .engine
        .seed(region(), 5, 3, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_none());
    assert!(s.events.events().is_empty());
    assert_eq!(s.transport.calls(), 0);
}

#[tokio::test]
async fn test_seeded_region_resolves_offline() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(DiskTileStore::new(temp.path()).unwrap());
    let s = setup(CacheConfig::default(), store.clone());
    s.engine
        .seed(region(), 2, 2, &CancellationToken::new())
        .await
        .unwrap();

    let config = CacheConfig::builder().use_only_cache(true).build();
    let offline = setup(config, store);
    for (row, col) in [(1, 1), (1, 2), (2, 1), (2, 2)] {
        let outcome = offline.engine.resolve_tile(&TileCoord::new(row, col, 2)).await;
        assert!(outcome.is_fresh(), "tile {row},{col} should be cached");
    }
    assert_eq!(offline.transport.calls(), 0);
}

#[tokio::test]
async fn test_cancelled_seed_reports_cancellation() {
    let s = setup(CacheConfig::default(), Arc::new(MemoryTileStore::new()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = s.engine.seed(region(), 2, 3, &cancel).await.unwrap().unwrap();

    assert!(report.cancelled);
    assert_eq!(s.transport.calls(), 0);
    assert_eq!(s.events.count("seedend"), 1);
}
