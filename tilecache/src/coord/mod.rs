//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, plus enumeration of the tiles covering
//! a bounding box. Seeding uses the enumeration to build its work queue.

mod types;

pub use types::{
    BoundingBox, CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;
use std::ops::RangeInclusive;

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to [`MAX_ZOOM`])
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are invalid.
/// Points on the east or south edge of the map fold into the last tile.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    // Validate inputs
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    // Calculate number of tiles at this zoom level
    let n = 2.0_f64.powi(zoom as i32);
    let last = (1u32 << zoom) - 1;

    // Convert longitude to tile X coordinate
    let col = (((lon + 180.0) / 360.0 * n) as u32).min(last);

    // Convert latitude to tile Y coordinate using Web Mercator projection
    let lat_rad = lat * PI / 180.0;
    let row = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32).min(last);

    Ok(TileCoord { row, col, zoom })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    // Convert tile X coordinate to longitude
    let lon = tile.col as f64 / n * 360.0 - 180.0;

    // Convert tile Y coordinate to latitude using inverse Web Mercator
    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Returns every tile at `zoom` that intersects `bbox`.
///
/// Tiles are ordered north to south, then west to east within a row.
pub fn tiles_covering(bbox: &BoundingBox, zoom: u8) -> Result<Vec<TileCoord>, CoordError> {
    let north_west = to_tile_coords(bbox.north, bbox.west, zoom)?;
    let south_east = to_tile_coords(bbox.south, bbox.east, zoom)?;

    let rows = north_west.row..=south_east.row;
    let cols = north_west.col..=south_east.col;

    let mut tiles = Vec::with_capacity(rows.clone().count() * cols.clone().count());
    for row in rows {
        for col in cols.clone() {
            tiles.push(TileCoord { row, col, zoom });
        }
    }

    Ok(tiles)
}

/// Returns every tile covering `bbox` across an inclusive zoom range.
///
/// Zoom levels are visited in ascending order; an empty range yields an
/// empty list.
pub fn tiles_in_region(
    bbox: &BoundingBox,
    zooms: RangeInclusive<u8>,
) -> Result<Vec<TileCoord>, CoordError> {
    let mut tiles = Vec::new();
    for zoom in zooms {
        tiles.extend(tiles_covering(bbox, zoom)?);
    }
    Ok(tiles)
}
