//! Application bootstrap.
//!
//! `TileCacheApp` turns an [`AppConfig`] into a ready-to-use engine:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    TileCacheApp                      │
//! │                                                      │
//! │  1. TileStore (disk + moka front cache, or memory)   │
//! │  2. HttpTransport (reqwest, configured timeout)      │
//! │  3. UrlTemplateSource (template, subdomains, zooms)  │
//! │  4. FanoutEventSink (tracing + caller sinks)         │
//! │  5. TileCacheEngine                                  │
//! └──────────────────────────────────────────────────────┘
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::TileCacheApp;
pub use config::AppConfig;
pub use error::AppError;
