//! Image decoding and grayscale conversion.
//!
//! [`decode`] turns encoded image bytes (PNG, JPEG, BMP, WebP) into a
//! [`PixelBuffer`]; [`to_grayscale`] produces the single-channel image the
//! reference detector works on.

use image::{GrayImage, ImageBuffer, Rgba};

use crate::types::{AcquisitionError, PixelBuffer};

/// Decode raw image bytes into an RGBA [`PixelBuffer`].
///
/// # Errors
///
/// Returns [`AcquisitionError::EmptyInput`] if `bytes` is empty.
/// Returns [`AcquisitionError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, AcquisitionError> {
    if bytes.is_empty() {
        return Err(AcquisitionError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(PixelBuffer::from_rgba(img.to_rgba8()))
}

/// Convert a pixel buffer to grayscale, ignoring alpha.
///
/// Uses the `image` crate's luminance weights, so green contributes
/// most and blue least.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(buffer: &PixelBuffer) -> GrayImage {
    // PixelBuffer guarantees width * height * 4 bytes, so the view
    // always fits; an empty image is the only sensible fallback.
    ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(buffer.width(), buffer.height(), buffer.pixels())
        .map_or_else(
            || GrayImage::new(0, 0),
            |view| image::imageops::grayscale(&view),
        )
}
