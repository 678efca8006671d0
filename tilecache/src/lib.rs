//! tilecache - Offline-capable map tile cache
//!
//! This library resolves slippy-map tiles through a persistent, revisioned
//! store using stale-while-revalidate, and can pre-seed a region so it is
//! available without a network.
//!
//! # High-Level API
//!
//! For most use cases, the [`app`] module wires everything from a config file:
//!
//! ```ignore
//! use tilecache::app::{AppConfig, TileCacheApp};
//! use tilecache::config::ConfigFile;
//! use tilecache::coord::TileCoord;
//!
//! let config = AppConfig::from_config_file(&ConfigFile::load()?);
//! let app = TileCacheApp::start(config)?;
//!
//! match app.engine().resolve_tile(&TileCoord::new(5, 3, 4)).await {
//!     TileOutcome::Fresh(blob) => display(blob),
//!     TileOutcome::Empty => show_placeholder(),
//!     TileOutcome::Failed(e) => report(e),
//! }
//! ```

pub mod address;
pub mod app;
pub mod cache;
pub mod codec;
pub mod config;
pub mod coord;
pub mod engine;
pub mod events;
pub mod logging;
pub mod seed;
pub mod transport;

pub use engine::{TileCacheEngine, TileOutcome};
pub use seed::{SeedDriver, SeedError, SeedReport};

/// Version of the tilecache library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
