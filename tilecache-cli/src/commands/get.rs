//! Get command - resolve one tile through the cache and save it.

use std::path::{Path, PathBuf};

use tilecache::coord::TileCoord;
use tilecache::TileOutcome;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the get command.
pub struct GetArgs {
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub output: Option<PathBuf>,
    pub offline: bool,
    pub no_cache: bool,
}

/// Run the get command.
pub async fn run(config_path: Option<&Path>, args: GetArgs) -> Result<(), CliError> {
    let tile = tile_from_args(args.z, args.x, args.y)?;

    let runner = CliRunner::new(config_path)?;
    runner.log_startup("get");

    let mut config = runner.app_config();
    if args.offline {
        config = config.offline();
    }
    if args.no_cache {
        config = config.without_cache();
    }
    let app = runner.start(config, Vec::new())?;

    let blob = match app.engine().resolve_tile(&tile).await {
        TileOutcome::Fresh(blob) => blob,
        TileOutcome::Empty => return Err(CliError::NotCached(tile_label(&tile))),
        TileOutcome::Failed(e) => return Err(CliError::Fetch(e)),
    };

    let path = args
        .output
        .unwrap_or_else(|| default_output(&tile, &blob.content_type));
    std::fs::write(&path, &blob.data).map_err(|error| CliError::FileWrite {
        path: path.clone(),
        error,
    })?;

    info!(tile = %tile, bytes = blob.len(), path = %path.display(), "Saved tile");
    println!(
        "Saved {} ({}, {} bytes) to {}",
        tile_label(&tile),
        blob.content_type,
        blob.len(),
        path.display()
    );
    Ok(())
}

/// Validates slippy-map `z/x/y` and converts to a tile coordinate.
fn tile_from_args(z: u8, x: u32, y: u32) -> Result<TileCoord, CliError> {
    if z > tilecache::coord::MAX_ZOOM {
        return Err(CliError::Usage(format!(
            "Zoom {} is above the maximum of {}",
            z,
            tilecache::coord::MAX_ZOOM
        )));
    }
    let tile = TileCoord::new(y, x, z);
    let limit = tile.tiles_per_axis();
    if x >= limit || y >= limit {
        return Err(CliError::Usage(format!(
            "Tile {}/{}/{} is outside the {}x{} grid at zoom {}",
            z, x, y, limit, limit, z
        )));
    }
    Ok(tile)
}

fn tile_label(tile: &TileCoord) -> String {
    format!("{}/{}/{}", tile.zoom, tile.col, tile.row)
}

fn default_output(tile: &TileCoord, content_type: &str) -> PathBuf {
    PathBuf::from(format!(
        "{}_{}_{}.{}",
        tile.zoom,
        tile.col,
        tile.row,
        extension_for(content_type)
    ))
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tif",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_from_args_maps_x_to_col() {
        let tile = tile_from_args(3, 5, 2).unwrap();
        assert_eq!(tile.col, 5);
        assert_eq!(tile.row, 2);
        assert_eq!(tile.zoom, 3);
    }

    #[test]
    fn test_tile_from_args_rejects_out_of_grid() {
        assert!(matches!(tile_from_args(2, 4, 0), Err(CliError::Usage(_))));
        assert!(matches!(tile_from_args(2, 0, 4), Err(CliError::Usage(_))));
        assert!(tile_from_args(2, 3, 3).is_ok());
    }

    #[test]
    fn test_default_output_uses_content_type() {
        let tile = TileCoord::new(2, 5, 3);
        assert_eq!(default_output(&tile, "image/jpeg"), PathBuf::from("3_5_2.jpg"));
        assert_eq!(
            default_output(&tile, "application/octet-stream"),
            PathBuf::from("3_5_2.bin")
        );
    }
}
