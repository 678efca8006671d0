//! Core trait for the revisioned tile store.
//!
//! The `TileStore` trait is the only thing the engine and the seed driver know
//! about persistence. Providers decide how records are laid out; callers only
//! rely on the revision protocol described on the trait.
//!
//! # Example
//!
//! ```ignore
//! use tilecache::cache::{MemoryTileStore, TileStore};
//! use tilecache::codec::TileBlob;
//!
//! let store = MemoryTileStore::new();
//! let rev = store.put(key, TileBlob::new("image/png", data), chrono::Utc::now()).await?;
//! let record = store.get(key).await?.expect("just stored");
//! assert_eq!(record.revision, rev);
//! ```

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::{Revision, StoreStats, TileRecord};
use crate::codec::TileBlob;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error while reading or writing a record.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be parsed.
    #[error("Corrupt record at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// Record header could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Revisioned key-value store for tile records.
///
/// # Revisions
///
/// Every `put` creates a new revision whose sequence number is one past the
/// highest live revision of that key. Nothing is overwritten in place. A
/// refresh writes the new revision first and deletes the superseded one only
/// after the write succeeded, so a failed refresh leaves the old data live.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; a single store is shared by the
/// engine and the seed driver as `Arc<dyn TileStore>`.
pub trait TileStore: Send + Sync {
    /// Returns the newest live revision for `key`, if any.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<TileRecord>, StoreError>>;

    /// Stores `blob` as a new revision of `key`.
    fn put(
        &self,
        key: &str,
        blob: TileBlob,
        timestamp: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Revision, StoreError>>;

    /// Removes one revision. Deleting a revision that does not exist is a no-op.
    fn delete(&self, key: &str, revision: &Revision) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Lists the live revisions of `key`, oldest first.
    fn revisions(&self, key: &str) -> BoxFuture<'_, Result<Vec<Revision>, StoreError>>;

    /// Counts live records and their payload bytes.
    fn stats(&self) -> BoxFuture<'_, Result<StoreStats, StoreError>>;

    /// Removes every record, returning what was removed.
    fn clear(&self) -> BoxFuture<'_, Result<StoreStats, StoreError>>;

    /// Name for logging.
    fn name(&self) -> &str {
        "store"
    }
}
