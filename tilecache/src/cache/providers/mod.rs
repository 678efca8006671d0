//! Tile store implementations.
//!
//! # Available Providers
//!
//! - [`MemoryTileStore`]: process-lifetime store on a sharded map
//! - [`DiskTileStore`]: one file per revision with an optional moka front cache
//!
//! Which one the application uses is chosen by `backend` in the `[cache]`
//! section of the config file.

mod disk;
mod memory;

pub use disk::DiskTileStore;
pub use memory::MemoryTileStore;
