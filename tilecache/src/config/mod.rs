//! Configuration for the tile cache.
//!
//! Two layers:
//!
//! - [`CacheConfig`]: the runtime options the engine reads
//!   (`use_cache`, `save_to_cache`, `use_only_cache`, `cache_format`,
//!   `cache_max_age`).
//! - [`ConfigFile`]: the user's `~/.tilecache/config.ini`, which also
//!   describes the tile source, the store backend, and logging.
//!
//! # Example
//!
//! ```
//! use tilecache::config::ConfigFile;
//!
//! let config = ConfigFile::from_ini_str("[cache]\nonly_cache = true\n").unwrap();
//! assert!(config.cache.to_cache_config().use_only_cache);
//! ```

mod cache;
mod defaults;
mod duration;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use cache::{CacheConfig, CacheConfigBuilder};
pub use defaults::*;
pub use duration::{format_duration, parse_duration, DurationParseError};
pub use file::ConfigFileError;
pub use settings::{CacheSettings, ConfigFile, LoggingSettings, SourceSettings, StoreBackend};
pub use size::{format_size, parse_size, SizeParseError};
