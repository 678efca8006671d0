//! Image codec abstraction.
//!
//! A [`TileCodec`] converts the raw bytes returned by the transport into the
//! [`TileBlob`] that gets stored and displayed.
//!
//! ```text
//! transport bytes ──► TileCodec::encode ──► TileBlob { content_type, data }
//!                                              │
//!                                              ├──► TileStore::put
//!                                              └──► display surface
//! ```
//!
//! # Available Codecs
//!
//! - [`ImageCodec`]: decodes and re-encodes to a configured MIME type
//!   (`image/png`, `image/jpeg`, `image/webp`, ...)
//! - [`PassthroughCodec`]: stores the bytes as received, sniffing the type

mod blob;
mod raster;

pub use blob::{TileBlob, RAW_CONTENT_TYPE};
pub use raster::{ImageCodec, PassthroughCodec};

use std::sync::Arc;

use thiserror::Error;

/// Name of the format that selects [`PassthroughCodec`].
pub const PASSTHROUGH_FORMAT: &str = "passthrough";

/// Errors from encoding or decoding tile images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input bytes are not a recognizable image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Re-encoding to the target format failed.
    #[error("Failed to encode image as {format}: {reason}")]
    Encode { format: String, reason: String },

    /// Target format is not supported.
    #[error("Unsupported cache format: {0}")]
    UnsupportedFormat(String),
}

/// Converts fetched bytes into a storable blob.
///
/// Encoding is CPU-bound; the engine runs it on the blocking pool.
pub trait TileCodec: Send + Sync {
    /// Encodes raw transport bytes into a blob.
    fn encode(&self, raw: &[u8]) -> Result<TileBlob, CodecError>;

    /// MIME type this codec produces, or `None` if it depends on the input.
    fn content_type(&self) -> Option<&str>;
}

/// Builds the codec for a configured `cache_format`.
///
/// `"passthrough"` selects [`PassthroughCodec`]; anything else must be an image
/// MIME type the `image` crate can write.
pub fn codec_for_format(format: &str) -> Result<Arc<dyn TileCodec>, CodecError> {
    if format.eq_ignore_ascii_case(PASSTHROUGH_FORMAT) {
        return Ok(Arc::new(PassthroughCodec));
    }
    Ok(Arc::new(ImageCodec::new(format)?))
}
