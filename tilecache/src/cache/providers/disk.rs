//! On-disk tile store.
//!
//! Each revision is one file:
//!
//! ```text
//! <root>/<h[0..2]>/<h>/<seq>-<digest>.tile      h = sha256(key) in hex
//! ```
//!
//! A record file is `TCR1`, a little-endian `u32` header length, a JSON
//! header, then the blob bytes. Files are written to a `.tmp` sibling and
//! renamed into place, so readers only ever see complete records.
//!
//! Writes to the same key are serialized through striped async locks. An
//! optional moka front cache keeps recently read records in memory.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use moka::future::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::traits::{BoxFuture, StoreError, TileStore};
use crate::cache::types::{Revision, StoreStats, TileRecord};
use crate::codec::TileBlob;

/// File magic identifying a record.
const MAGIC: &[u8; 4] = b"TCR1";

/// Record file extension.
const TILE_EXT: &str = "tile";

/// Suffix for records that are still being written.
const TMP_EXT: &str = "tmp";

/// Number of lock stripes for per-key write serialization.
const LOCK_STRIPES: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
struct RecordHeader {
    key: String,
    timestamp_ms: i64,
    content_type: String,
}

/// Persistent revisioned store rooted at a directory.
pub struct DiskTileStore {
    root: PathBuf,
    locks: Vec<Mutex<()>>,
    /// Newest record per key, if front caching is enabled.
    front: Option<MokaCache<String, TileRecord>>,
}

impl DiskTileStore {
    /// Opens (creating if needed) a store at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            front: None,
        })
    }

    /// Enables an in-memory front cache bounded to `max_bytes` of payload.
    pub fn with_front_cache(mut self, max_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            // Weight each entry by its payload size
            .weigher(|_key: &String, record: &TileRecord| -> u32 {
                record.blob.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_bytes)
            .build();
        self.front = Some(cache);
        self
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_dir(&self, key: &str) -> (PathBuf, usize) {
        let digest = Sha256::digest(key.as_bytes());
        let hex = format!("{:x}", digest);
        let stripe = digest[0] as usize % LOCK_STRIPES;
        (self.root.join(&hex[..2]).join(&hex), stripe)
    }

    fn record_path(dir: &Path, revision: &Revision) -> PathBuf {
        dir.join(format!("{}.{}", revision, TILE_EXT))
    }

    /// Live revisions in `dir`, oldest first. A missing directory has none.
    async fn list_revisions(dir: &Path) -> Result<Vec<Revision>, StoreError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut revisions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TILE_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse::<Revision>() {
                Ok(rev) => revisions.push(rev),
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unrecognized file"),
            }
        }

        revisions.sort();
        Ok(revisions)
    }

    async fn load_newest(&self, key: &str, dir: &Path) -> Result<Option<TileRecord>, StoreError> {
        let revisions = Self::list_revisions(dir).await?;
        let Some(revision) = revisions.into_iter().last() else {
            return Ok(None);
        };

        let path = Self::record_path(dir, &revision);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            // Deleted between listing and reading
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record = decode_record(&path, Bytes::from(bytes), revision)?;
        if record.key != key {
            return Err(StoreError::Corrupt {
                path: path.display().to_string(),
                reason: format!("record belongs to key '{}'", record.key),
            });
        }
        Ok(Some(record))
    }

    /// Every record file under the root with its size in bytes.
    async fn record_files(&self) -> Result<Vec<(PathBuf, u64)>, StoreError> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if path.extension().and_then(|e| e.to_str()) == Some(TILE_EXT) {
                    files.push((path, entry.metadata().await?.len()));
                }
            }
        }

        Ok(files)
    }
}

impl TileStore for DiskTileStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<TileRecord>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            if let Some(front) = &self.front {
                if let Some(record) = front.get(&key).await {
                    return Ok(Some(record));
                }
            }

            let (dir, stripe) = self.key_dir(&key);
            // Held so a concurrent put cannot be shadowed by this load in the front cache
            let _guard = self.locks[stripe].lock().await;

            let record = self.load_newest(&key, &dir).await?;
            if let (Some(front), Some(record)) = (&self.front, &record) {
                front.insert(key, record.clone()).await;
            }
            Ok(record)
        })
    }

    fn put(
        &self,
        key: &str,
        blob: TileBlob,
        timestamp: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Revision, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let (dir, stripe) = self.key_dir(&key);
            let _guard = self.locks[stripe].lock().await;

            let existing = Self::list_revisions(&dir).await?;
            let seq = Revision::next_seq(existing.last());
            let revision = Revision::compute(seq, &key, timestamp, &blob.data);

            let encoded = encode_record(&key, timestamp, &blob)?;
            tokio::fs::create_dir_all(&dir).await?;

            let path = Self::record_path(&dir, &revision);
            let temp_path = path.with_extension(TMP_EXT);
            tokio::fs::write(&temp_path, &encoded).await?;
            if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(e.into());
            }

            debug!(key = %key, revision = %revision, bytes = blob.len(), "Stored tile record");

            if let Some(front) = &self.front {
                let record = TileRecord {
                    key: key.clone(),
                    blob,
                    timestamp,
                    revision: revision.clone(),
                };
                front.insert(key, record).await;
            }

            Ok(revision)
        })
    }

    fn delete(&self, key: &str, revision: &Revision) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        let revision = revision.clone();
        Box::pin(async move {
            let (dir, stripe) = self.key_dir(&key);
            let _guard = self.locks[stripe].lock().await;

            match tokio::fs::remove_file(Self::record_path(&dir, &revision)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e.into()),
            }

            if let Some(front) = &self.front {
                let cached = front.get(&key).await;
                if cached.is_some_and(|r| r.revision == revision) {
                    front.invalidate(&key).await;
                }
            }

            // Fails harmlessly while other revisions remain
            let _ = tokio::fs::remove_dir(&dir).await;
            Ok(())
        })
    }

    fn revisions(&self, key: &str) -> BoxFuture<'_, Result<Vec<Revision>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let (dir, _) = self.key_dir(&key);
            Self::list_revisions(&dir).await
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<StoreStats, StoreError>> {
        Box::pin(async move {
            let files = self.record_files().await?;
            Ok(StoreStats {
                entries: files.len() as u64,
                bytes: files.iter().map(|(_, len)| len).sum(),
            })
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<StoreStats, StoreError>> {
        Box::pin(async move {
            // Writers are excluded for the whole sweep
            let mut guards = Vec::with_capacity(self.locks.len());
            for lock in &self.locks {
                guards.push(lock.lock().await);
            }

            let files = self.record_files().await?;
            let removed = StoreStats {
                entries: files.len() as u64,
                bytes: files.iter().map(|(_, len)| len).sum(),
            };

            let mut entries = tokio::fs::read_dir(&self.root).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    tokio::fs::remove_dir_all(entry.path()).await?;
                }
            }

            if let Some(front) = &self.front {
                front.invalidate_all();
                front.run_pending_tasks().await;
            }

            debug!(
                root = %self.root.display(),
                entries = removed.entries,
                bytes = removed.bytes,
                "Cleared tile store"
            );
            Ok(removed)
        })
    }

    fn name(&self) -> &str {
        "disk"
    }
}

fn encode_record(
    key: &str,
    timestamp: DateTime<Utc>,
    blob: &TileBlob,
) -> Result<Vec<u8>, StoreError> {
    let header = serde_json::to_vec(&RecordHeader {
        key: key.to_string(),
        timestamp_ms: timestamp.timestamp_millis(),
        content_type: blob.content_type.clone(),
    })?;

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + blob.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(header.len() as u32).to_le_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(&blob.data);
    Ok(out)
}

fn decode_record(path: &Path, bytes: Bytes, revision: Revision) -> Result<TileRecord, StoreError> {
    let corrupt = |reason: &str| StoreError::Corrupt {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    if bytes.len() < MAGIC.len() + 4 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(corrupt("bad magic"));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[MAGIC.len()..MAGIC.len() + 4]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let header_start = MAGIC.len() + 4;
    let data_start = header_start
        .checked_add(header_len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| corrupt("truncated header"))?;

    let header: RecordHeader = serde_json::from_slice(&bytes[header_start..data_start])?;
    let timestamp = Utc
        .timestamp_millis_opt(header.timestamp_ms)
        .single()
        .ok_or_else(|| corrupt("timestamp out of range"))?;

    Ok(TileRecord {
        key: header.key,
        blob: TileBlob::new(header.content_type, bytes.slice(data_start..)),
        timestamp,
        revision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn blob(data: &[u8]) -> TileBlob {
        TileBlob::new("image/png", data.to_vec())
    }

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn stores(dir: &TempDir) -> Vec<DiskTileStore> {
        vec![
            DiskTileStore::new(dir.path().join("plain")).unwrap(),
            DiskTileStore::new(dir.path().join("front"))
                .unwrap()
                .with_front_cache(1024 * 1024),
        ]
    }

    #[tokio::test]
    async fn test_disk_store_put_and_get() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir) {
            let rev = store
                .put("http://t/1/0/0.png", blob(&[1, 2, 3]), ts(1_700_000_000_000))
                .await
                .unwrap();
            assert_eq!(rev.seq, 1);

            let record = store.get("http://t/1/0/0.png").await.unwrap().unwrap();
            assert_eq!(record.key, "http://t/1/0/0.png");
            assert_eq!(&record.blob.data[..], &[1, 2, 3]);
            assert_eq!(record.blob.content_type, "image/png");
            assert_eq!(record.timestamp, ts(1_700_000_000_000));
            assert_eq!(record.revision, rev);
        }
    }

    #[tokio::test]
    async fn test_disk_store_get_missing() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir) {
            assert!(store.get("nope").await.unwrap().is_none());
            assert!(store.revisions("nope").await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_disk_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = DiskTileStore::new(dir.path()).unwrap();
            store.put("k", blob(&[9]), ts(42)).await.unwrap();
        }

        let store = DiskTileStore::new(dir.path()).unwrap();
        let record = store.get("k").await.unwrap().unwrap();
        assert_eq!(&record.blob.data[..], &[9]);
        assert_eq!(record.timestamp, ts(42));
    }

    #[tokio::test]
    async fn test_disk_store_refresh_protocol() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir) {
            let old = store.put("k", blob(&[1]), ts(0)).await.unwrap();
            let new = store.put("k", blob(&[2]), ts(1)).await.unwrap();
            assert_eq!(store.revisions("k").await.unwrap(), vec![old.clone(), new.clone()]);

            store.delete("k", &old).await.unwrap();
            assert_eq!(store.revisions("k").await.unwrap(), vec![new]);

            let record = store.get("k").await.unwrap().unwrap();
            assert_eq!(&record.blob.data[..], &[2]);
        }
    }

    #[tokio::test]
    async fn test_disk_store_delete_invalidates_front_cache() {
        let dir = TempDir::new().unwrap();
        let store = DiskTileStore::new(dir.path())
            .unwrap()
            .with_front_cache(1024);

        let rev = store.put("k", blob(&[1]), ts(0)).await.unwrap();
        assert!(store.get("k").await.unwrap().is_some());

        store.delete("k", &rev).await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_store_delete_missing_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = DiskTileStore::new(dir.path()).unwrap();
        let rev = store.put("k", blob(&[1]), ts(0)).await.unwrap();

        store.delete("k", &Revision::compute(5, "k", ts(0), b"")).await.unwrap();
        store.delete("other", &rev).await.unwrap();

        assert_eq!(store.revisions("k").await.unwrap(), vec![rev]);
    }

    #[tokio::test]
    async fn test_disk_store_ignores_partial_writes() {
        let dir = TempDir::new().unwrap();
        let store = DiskTileStore::new(dir.path()).unwrap();
        let rev = store.put("k", blob(&[1]), ts(0)).await.unwrap();

        // Simulate a crash mid-write of a newer revision
        let (key_dir, _) = store.key_dir("k");
        std::fs::write(key_dir.join("2-00000000000000aa.tmp"), b"TCR1junk").unwrap();

        let record = store.get("k").await.unwrap().unwrap();
        assert_eq!(record.revision, rev);
    }

    #[tokio::test]
    async fn test_disk_store_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let store = DiskTileStore::new(dir.path()).unwrap();
        let rev = store.put("k", blob(&[1]), ts(0)).await.unwrap();

        let (key_dir, _) = store.key_dir("k");
        std::fs::write(DiskTileStore::record_path(&key_dir, &rev), b"garbage").unwrap();

        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_disk_store_stats_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = DiskTileStore::new(dir.path())
            .unwrap()
            .with_front_cache(1024);

        store.put("a", blob(&[0; 10]), ts(0)).await.unwrap();
        store.put("b", blob(&[0; 20]), ts(0)).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entries, 2);
        // On-disk size includes headers
        assert!(stats.bytes > 30);

        let removed = store.clear().await.unwrap();
        assert_eq!(removed, stats);
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_store_concurrent_puts_same_key() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DiskTileStore::new(dir.path()).unwrap());

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.put("k", blob(&[i]), ts(i as i64)).await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let seqs: Vec<u64> = store
            .revisions("k")
            .await
            .unwrap()
            .iter()
            .map(|r| r.seq)
            .collect();
        assert_eq!(seqs, (1..=8).collect::<Vec<u64>>());
    }

    #[test]
    fn test_record_encoding_layout() {
        let encoded = encode_record("k", ts(7), &blob(&[0xAB, 0xCD])).unwrap();
        assert_eq!(&encoded[..4], MAGIC);
        assert_eq!(&encoded[encoded.len() - 2..], &[0xAB, 0xCD]);

        let rev = Revision::compute(1, "k", ts(7), &[0xAB, 0xCD]);
        let record = decode_record(Path::new("x"), Bytes::from(encoded), rev).unwrap();
        assert_eq!(record.key, "k");
        assert_eq!(record.timestamp, ts(7));
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&1000u32.to_le_bytes());
        bytes.extend_from_slice(b"{}");

        let rev = Revision::compute(1, "k", ts(0), b"");
        let err = decode_record(Path::new("x"), Bytes::from(bytes), rev).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
