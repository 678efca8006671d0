//! Tile addressing.
//!
//! A [`TileAddressSource`] turns a [`TileCoord`] into the key used both as the
//! network request URL and as the cache's primary key, and enumerates the
//! tiles covering a region for seeding. The engine receives one as an
//! injected capability rather than through inheritance, so any addressing
//! scheme can be plugged in.
//!
//! # Example
//!
//! ```
//! use tilecache::address::{TileAddressSource, UrlTemplateSource};
//! use tilecache::coord::TileCoord;
//!
//! let source = UrlTemplateSource::new("https://{s}.tile.example.com/{z}/{x}/{y}.png")
//!     .unwrap()
//!     .with_subdomains(["a", "b", "c"]);
//!
//! let key = source.address(&TileCoord::new(5, 3, 4));
//! assert_eq!(key, "https://c.tile.example.com/4/3/5.png");
//! ```

mod template;

pub use template::{TemplateError, UrlTemplateSource};

use std::ops::RangeInclusive;

use crate::coord::{self, BoundingBox, CoordError, TileCoord};

/// Capability for addressing tiles and enumerating regions.
pub trait TileAddressSource: Send + Sync {
    /// Produces the request key for a tile.
    fn address(&self, tile: &TileCoord) -> String;

    /// Minimum zoom level this source serves.
    fn min_zoom(&self) -> u8 {
        coord::MIN_ZOOM
    }

    /// Maximum zoom level this source serves.
    fn max_zoom(&self) -> u8 {
        coord::MAX_ZOOM
    }

    /// Enumerates the tiles covering `bbox` at every zoom in `zooms`.
    ///
    /// Zoom levels outside the source's own range are skipped.
    fn tiles_in_region(
        &self,
        bbox: &BoundingBox,
        zooms: RangeInclusive<u8>,
    ) -> Result<Vec<TileCoord>, CoordError> {
        let lo = (*zooms.start()).max(self.min_zoom());
        let hi = (*zooms.end()).min(self.max_zoom());
        coord::tiles_in_region(bbox, lo..=hi)
    }
}
