//! Deterministic stand-in for a composed result.
//!
//! Used when no composition backend is configured: a flat light-gray
//! portrait canvas, encoded as PNG. The same call always yields the same
//! bytes.

use image::ImageEncoder;

use crate::types::{ComposedImage, Dimensions, PipelineError};

/// Canvas size of the placeholder result.
pub const PLACEHOLDER_DIMENSIONS: Dimensions = Dimensions {
    width: 400,
    height: 600,
};

/// Fill color of the placeholder canvas (`#f0f0f0`).
pub const PLACEHOLDER_FILL: [u8; 3] = [0xF0, 0xF0, 0xF0];

/// Render the placeholder result as a PNG.
///
/// # Errors
///
/// Returns [`PipelineError::ImageEncode`] if PNG encoding fails.
pub fn render_placeholder() -> Result<ComposedImage, PipelineError> {
    let Dimensions { width, height } = PLACEHOLDER_DIMENSIONS;
    let canvas = image::RgbImage::from_pixel(width, height, image::Rgb(PLACEHOLDER_FILL));

    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(
        canvas.as_raw(),
        width,
        height,
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(ComposedImage::new("image/png", png_bytes))
}
