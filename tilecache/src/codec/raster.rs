//! Raster codecs backed by the `image` crate.

use std::io::Cursor;

use ::image::{DynamicImage, ImageFormat};
use bytes::Bytes;

use super::{CodecError, TileBlob, TileCodec};

/// Formats we are willing to store tiles in.
const WRITABLE_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Bmp,
    ImageFormat::Gif,
    ImageFormat::Tiff,
];

/// Decodes fetched tiles and re-encodes them to a fixed format.
///
/// Tiles already in the target format are validated by decoding but stored
/// byte-for-byte, avoiding a second lossy pass for JPEG sources.
#[derive(Debug, Clone)]
pub struct ImageCodec {
    format: ImageFormat,
}

impl ImageCodec {
    /// Creates a codec for a MIME type such as `image/png`.
    pub fn new(mime_type: &str) -> Result<Self, CodecError> {
        let format = ImageFormat::from_mime_type(mime_type.trim())
            .filter(|f| WRITABLE_FORMATS.contains(f))
            .ok_or_else(|| CodecError::UnsupportedFormat(mime_type.to_string()))?;

        Ok(Self { format })
    }

    /// Decodes a stored blob for inspection.
    pub fn decode(&self, blob: &TileBlob) -> Result<DynamicImage, CodecError> {
        ::image::load_from_memory(&blob.data).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn mime(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

impl TileCodec for ImageCodec {
    fn encode(&self, raw: &[u8]) -> Result<TileBlob, CodecError> {
        let source_format =
            ::image::guess_format(raw).map_err(|e| CodecError::Decode(e.to_string()))?;
        let decoded = ::image::load_from_memory_with_format(raw, source_format)
            .map_err(|e| CodecError::Decode(e.to_string()))?;

        if source_format == self.format {
            return Ok(TileBlob::new(self.mime(), Bytes::copy_from_slice(raw)));
        }

        // JPEG has no alpha channel
        let image = match self.format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(decoded.to_rgb8()),
            _ => decoded,
        };

        let mut buffer = Vec::with_capacity(raw.len());
        image
            .write_to(&mut Cursor::new(&mut buffer), self.format)
            .map_err(|e| CodecError::Encode {
                format: self.mime().to_string(),
                reason: e.to_string(),
            })?;

        Ok(TileBlob::new(self.mime(), buffer))
    }

    fn content_type(&self) -> Option<&str> {
        Some(self.mime())
    }
}

/// Stores fetched bytes unchanged, labelled with their sniffed type.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCodec;

impl TileCodec for PassthroughCodec {
    fn encode(&self, raw: &[u8]) -> Result<TileBlob, CodecError> {
        let format = ::image::guess_format(raw).map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(TileBlob::new(
            format.to_mime_type(),
            Bytes::copy_from_slice(raw),
        ))
    }

    fn content_type(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{Rgba, RgbaImage};

    fn sample(format: ImageFormat) -> Vec<u8> {
        let image = RgbaImage::from_fn(8, 8, |x, y| Rgba([x as u8 * 30, y as u8 * 30, 128, 255]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut buffer), format)
            .unwrap();
        buffer
    }

    #[test]
    fn test_png_to_jpeg() {
        let codec = ImageCodec::new("image/jpeg").unwrap();
        let blob = codec.encode(&sample(ImageFormat::Png)).unwrap();

        assert_eq!(blob.content_type, "image/jpeg");
        assert_eq!(
            ::image::guess_format(&blob.data).unwrap(),
            ImageFormat::Jpeg
        );
        let decoded = codec.decode(&blob).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn test_same_format_is_stored_verbatim() {
        let png = sample(ImageFormat::Png);
        let codec = ImageCodec::new("image/png").unwrap();
        let blob = codec.encode(&png).unwrap();

        assert_eq!(&blob.data[..], &png[..]);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let codec = ImageCodec::new("image/png").unwrap();
        let err = codec.encode(b"<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_unsupported_mime() {
        assert!(matches!(
            ImageCodec::new("image/x-unknown"),
            Err(CodecError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_passthrough_sniffs_type() {
        let jpeg = sample(ImageFormat::Jpeg);
        let blob = PassthroughCodec.encode(&jpeg).unwrap();

        assert_eq!(blob.content_type, "image/jpeg");
        assert_eq!(&blob.data[..], &jpeg[..]);
    }

    #[test]
    fn test_passthrough_rejects_non_image() {
        assert!(PassthroughCodec.encode(b"not an image").is_err());
    }
}
