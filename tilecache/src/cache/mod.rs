//! Revisioned tile storage.
//!
//! The engine persists encoded tiles through the [`TileStore`] trait. A store
//! keeps one or more revisions per key; the refresh protocol (write the new
//! revision, then delete the old one) keeps at most one live revision per key
//! in steady state.
//!
//! # Architecture
//!
//! ```text
//! TileCacheEngine / SeedDriver
//!            │
//!            ▼
//!   Arc<dyn TileStore>
//!       │          │
//!       ▼          ▼
//! MemoryTileStore  DiskTileStore ──► moka front cache (optional)
//! ```

pub mod providers;
mod traits;
mod types;

pub use providers::{DiskTileStore, MemoryTileStore};
pub use traits::{BoxFuture, StoreError, TileStore};
pub use types::{ParseRevisionError, Revision, StoreStats, TileRecord};
