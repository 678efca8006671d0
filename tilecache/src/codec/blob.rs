//! Encoded tile payload.

use std::fmt;

use bytes::Bytes;

/// Content type of bytes that have not been through a codec.
pub const RAW_CONTENT_TYPE: &str = "application/octet-stream";

/// Display-ready tile data.
///
/// Cheap to clone: the payload is reference counted.
#[derive(Clone, PartialEq, Eq)]
pub struct TileBlob {
    pub content_type: String,
    pub data: Bytes,
}

impl TileBlob {
    pub fn new(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Wraps transport bytes that skipped encoding.
    ///
    /// Raw blobs are usable for display but are never persisted.
    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self::new(RAW_CONTENT_TYPE, data)
    }

    pub fn is_raw(&self) -> bool {
        self.content_type == RAW_CONTENT_TYPE
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// Payloads are images; printing them is never useful.
impl fmt::Debug for TileBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileBlob")
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}
