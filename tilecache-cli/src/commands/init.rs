//! Init command - write the default configuration file.

use std::path::Path;

use tilecache::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    let written = if force {
        ConfigFile::default().save_to(&path)?;
        true
    } else {
        ConfigFile::ensure_exists_at(&path)?
    };

    if written {
        println!("Wrote configuration file: {}", path.display());
    } else {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    }
    println!();
    println!("Edit this file to set the tile source and cache options.");
    Ok(())
}
