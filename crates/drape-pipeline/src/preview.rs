//! Inline previews for staged inputs.
//!
//! A preview is a self-contained `data:` URL that a presentation layer
//! can use directly as an image source. Encoding is pure but
//! proportional to the file size, so the async shell runs it off the
//! submitting task.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::types::Dimensions;

/// A decoded, directly displayable representation of an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    /// `data:<mime>;base64,<payload>` URL of the raw file bytes.
    pub data_url: String,
    /// Pixel dimensions, when the bytes could be decoded as an image.
    pub dimensions: Option<Dimensions>,
}

impl Preview {
    /// Build a preview from raw file bytes.
    ///
    /// Never fails: bytes that do not decode as a known image format
    /// still get a data URL, just without dimensions.
    #[must_use]
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            data_url: data_url(mime_type, bytes),
            dimensions: probe_dimensions(bytes),
        }
    }
}

/// Encode bytes as a base64 `data:` URL.
#[must_use]
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Read the image header to find its dimensions without a full decode.
fn probe_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    if bytes.is_empty() {
        return None;
    }
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some(Dimensions { width, height })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine as _;

    use super::*;

    /// Helper: encode a solid RGBA image as PNG bytes.
    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |_, _| image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn data_url_has_mime_prefix_and_base64_payload() {
        assert_eq!(data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
        assert_eq!(data_url("image/gif", &[]), "data:image/gif;base64,");
    }

    #[test]
    fn valid_png_records_dimensions() {
        let bytes = png_bytes(7, 3);
        let preview = Preview::encode("image/png", &bytes);
        assert!(preview.data_url.starts_with("data:image/png;base64,"));
        assert_eq!(
            preview.dimensions,
            Some(Dimensions {
                width: 7,
                height: 3
            })
        );
    }

    #[test]
    fn undecodable_bytes_still_produce_a_data_url() {
        let preview = Preview::encode("image/heic", &[0xFF, 0x00, 0x13]);
        assert_eq!(preview.data_url, "data:image/heic;base64,/wAT");
        assert_eq!(preview.dimensions, None);
    }

    #[test]
    fn data_url_payload_decodes_back_to_the_bytes() {
        let bytes = png_bytes(2, 2);
        let preview = Preview::encode("image/png", &bytes);
        let payload = preview
            .data_url
            .strip_prefix("data:image/png;base64,")
            .unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), bytes);
    }
}
