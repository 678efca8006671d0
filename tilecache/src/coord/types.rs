//! Coordinate types for Web Mercator tiles and geographic regions.

use std::fmt;

use thiserror::Error;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;

/// Minimum longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude.
pub const MAX_LON: f64 = 180.0;

/// Minimum supported zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum supported zoom level.
///
/// Slippy-map servers rarely go beyond 22; 24 leaves headroom while keeping
/// `2^zoom` comfortably inside `u32`.
pub const MAX_ZOOM: u8 = 24;

/// Errors from coordinate conversion and region validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude {0} (must be within ±85.05112878)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude {0} (must be within ±180)")]
    InvalidLongitude(f64),

    #[error("Invalid zoom level {0} (max {MAX_ZOOM})")]
    InvalidZoom(u8),

    #[error("Invalid bounding box: {0}")]
    InvalidBounds(String),
}

/// A single tile in the XYZ (slippy map) scheme.
///
/// `row` is the Y index counted from the north edge and `col` the X index
/// counted from the antimeridian, both in `0..2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub row: u32,
    pub col: u32,
    pub zoom: u8,
}

impl TileCoord {
    /// Creates a tile coordinate.
    pub fn new(row: u32, col: u32, zoom: u8) -> Self {
        Self { row, col, zoom }
    }

    /// Number of tiles along each axis at this tile's zoom level.
    #[inline]
    pub fn tiles_per_axis(&self) -> u32 {
        1u32 << self.zoom
    }

    /// Row index in the TMS scheme (Y counted from the south edge).
    #[inline]
    pub fn tms_row(&self) -> u32 {
        self.tiles_per_axis() - 1 - self.row
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// A geographic rectangle in degrees.
///
/// Regions crossing the antimeridian are not supported; split them into two
/// boxes instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Creates a validated bounding box.
    ///
    /// Latitudes outside the Web Mercator range are clamped to it so that a
    /// "whole world" box of ±90 is accepted.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, CoordError> {
        for lat in [south, north] {
            if !(-90.0..=90.0).contains(&lat) || lat.is_nan() {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        for lon in [west, east] {
            if !(MIN_LON..=MAX_LON).contains(&lon) || lon.is_nan() {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        if south > north {
            return Err(CoordError::InvalidBounds(format!(
                "south {} is north of {}",
                south, north
            )));
        }
        if west > east {
            return Err(CoordError::InvalidBounds(format!(
                "west {} is east of {} (antimeridian crossing is not supported)",
                west, east
            )));
        }

        Ok(Self {
            south: south.clamp(MIN_LAT, MAX_LAT),
            west,
            north: north.clamp(MIN_LAT, MAX_LAT),
            east,
        })
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.5},{:.5},{:.5},{:.5}",
            self.south, self.west, self.north, self.east
        )
    }
}

impl std::str::FromStr for BoundingBox {
    type Err = CoordError;

    /// Parses `"south,west,north,east"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CoordError::InvalidBounds(format!(
                "expected 'south,west,north,east', got '{}'",
                s
            )));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| {
                CoordError::InvalidBounds(format!("'{}' is not a number", part))
            })?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_display() {
        let tile = TileCoord::new(5, 3, 4);
        assert_eq!(tile.to_string(), "4/3/5");
    }

    #[test]
    fn test_tms_row() {
        let tile = TileCoord::new(0, 0, 3);
        assert_eq!(tile.tms_row(), 7);
        assert_eq!(TileCoord::new(7, 0, 3).tms_row(), 0);
    }

    #[test]
    fn test_bbox_rejects_inverted_latitudes() {
        let err = BoundingBox::new(10.0, 0.0, -10.0, 5.0).unwrap_err();
        assert!(matches!(err, CoordError::InvalidBounds(_)));
    }

    #[test]
    fn test_bbox_rejects_antimeridian_crossing() {
        let err = BoundingBox::new(0.0, 170.0, 10.0, -170.0).unwrap_err();
        assert!(matches!(err, CoordError::InvalidBounds(_)));
    }

    #[test]
    fn test_bbox_clamps_polar_latitudes() {
        let bbox = BoundingBox::new(-90.0, -180.0, 90.0, 180.0).unwrap();
        assert_eq!(bbox.north, MAX_LAT);
        assert_eq!(bbox.south, MIN_LAT);
    }

    #[test]
    fn test_bbox_rejects_bad_longitude() {
        let err = BoundingBox::new(0.0, -181.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, CoordError::InvalidLongitude(_)));
    }

    #[test]
    fn test_bbox_from_str() {
        let bbox: BoundingBox = "51.28, -0.51, 51.69, 0.33".parse().unwrap();
        assert_eq!(bbox.south, 51.28);
        assert_eq!(bbox.east, 0.33);

        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }
}
