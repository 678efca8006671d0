//! In-memory tile store using DashMap.
//!
//! Records live for the life of the process. Useful for tests, for
//! `backend = memory`, and for embedding the engine where persistence is
//! someone else's job.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::cache::traits::{BoxFuture, StoreError, TileStore};
use crate::cache::types::{Revision, StoreStats, TileRecord};
use crate::codec::TileBlob;

/// Revisioned store held in a sharded concurrent map.
///
/// Each key maps to its live revisions sorted oldest first. All mutations of a
/// key happen under that key's shard lock, so concurrent puts never hand out
/// the same sequence number.
#[derive(Default)]
pub struct MemoryTileStore {
    records: DashMap<String, Vec<TileRecord>>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with at least one live revision.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn totals(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for entry in self.records.iter() {
            for record in entry.value() {
                stats.entries += 1;
                stats.bytes += record.blob.len() as u64;
            }
        }
        stats
    }
}

impl TileStore for MemoryTileStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<TileRecord>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(self
                .records
                .get(&key)
                .and_then(|records| records.last().cloned()))
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
            let mut records = self.records.entry(key.clone()).or_default();
            let seq = Revision::next_seq(records.last().map(|r| &r.revision));
            let revision = Revision::compute(seq, &key, timestamp, &blob.data);

            records.push(TileRecord {
                key,
                blob,
                timestamp,
                revision: revision.clone(),
            });

            Ok(revision)
        })
    }

    fn delete(&self, key: &str, revision: &Revision) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        let revision = revision.clone();
        Box::pin(async move {
            let emptied = match self.records.get_mut(&key) {
                Some(mut records) => {
                    records.retain(|r| r.revision != revision);
                    records.is_empty()
                }
                None => false,
            };

            if emptied {
                self.records.remove_if(&key, |_, records| records.is_empty());
            }
            Ok(())
        })
    }

    fn revisions(&self, key: &str) -> BoxFuture<'_, Result<Vec<Revision>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(self
                .records
                .get(&key)
                .map(|records| records.iter().map(|r| r.revision.clone()).collect())
                .unwrap_or_default())
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<StoreStats, StoreError>> {
        Box::pin(async move { Ok(self.totals()) })
    }

    fn clear(&self) -> BoxFuture<'_, Result<StoreStats, StoreError>> {
        Box::pin(async move {
            let removed = self.totals();
            self.records.clear();
            Ok(removed)
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
