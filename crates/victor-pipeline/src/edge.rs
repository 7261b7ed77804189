//! Canny edge detection.
//!
//! Wraps [`imageproc::edges::canny`]. The output is a binary image where
//! white pixels (255) are edges and black pixels (0) are background.

use image::GrayImage;

/// Minimum allowed Canny threshold.
///
/// A zero low threshold marks every pixel with any gradient as a
/// candidate edge, which floods the detector with tiny segments.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Both thresholds are clamped to at least [`MIN_THRESHOLD`], and
/// `low_threshold` is clamped to at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}
