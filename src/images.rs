//! Coin picture decoding.
//!
//! Downloaded payloads are decoded once with the `image` crate to prove
//! they are real pictures and to learn their dimensions. The original
//! encoded bytes are kept for storage.

use image::ImageFormat;

use crate::error::CatalogError;

/// A decoded coin picture.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Encoded payload as downloaded.
    pub data: Vec<u8>,
}

impl CoinImage {
    /// Decode `data`, rejecting anything that is not a supported picture.
    pub fn decode(data: Vec<u8>) -> Result<Self, CatalogError> {
        if data.is_empty() {
            return Err(CatalogError::Decode("empty payload".to_string()));
        }
        let format = image::guess_format(&data).map_err(|e| CatalogError::Decode(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(&data, format)
            .map_err(|e| CatalogError::Decode(e.to_string()))?;

        Ok(Self {
            format,
            width: decoded.width(),
            height: decoded.height(),
            data,
        })
    }

    pub fn format_name(&self) -> &'static str {
        format_name(self.format)
    }

    /// Rebuild an image from stored bytes without decoding pixels again.
    pub fn from_stored(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        let format = image::guess_format(&data).ok()?;
        Some(Self {
            format,
            width,
            height,
            data,
        })
    }
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        _ => "other",
    }
}
