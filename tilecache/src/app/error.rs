//! Application error types.

use thiserror::Error;

use crate::address::TemplateError;
use crate::cache::StoreError;
use crate::codec::CodecError;
use crate::config::ConfigFileError;
use crate::transport::TransportError;

/// Errors that can occur while bootstrapping the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Config file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigFileError),

    /// Tile store could not be opened.
    #[error("Failed to open tile store: {0}")]
    Store(#[from] StoreError),

    /// Configured cache format is unusable.
    #[error("Invalid cache format: {0}")]
    Codec(#[from] CodecError),

    /// Source URL template is invalid.
    #[error("Invalid source template: {0}")]
    Template(#[from] TemplateError),

    /// HTTP client could not be built.
    #[error("Failed to create transport: {0}")]
    Transport(#[from] TransportError),
}
