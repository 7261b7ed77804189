//! Line segment detection.
//!
//! The stitcher does not care where segments come from. [`LineDetector`] is
//! the seam: anything that can turn a [`PixelBuffer`] into a list of
//! [`RawSegment`]s inside the image bounds can drive the pipeline. Plain
//! closures implement it too, which keeps tests and embedders free of
//! boilerplate.
//!
//! [`ContourSegmentDetector`] is the bundled implementation, built from
//! ordinary raster stages:
//!
//! 1. Grayscale conversion
//! 2. Gaussian blur (noise reduction)
//! 3. Canny edge detection
//! 4. Border-following contour tracing
//! 5. Ramer-Douglas-Peucker simplification
//! 6. Each pair of consecutive simplified points becomes one segment

use crate::config::DetectorConfig;
use crate::types::{DetectionError, Dimensions, PixelBuffer, RawSegment};

/// Turns pixels into straight line segments.
///
/// Implementations must report coordinates within
/// `[0, width] x [0, height]`; nothing else about the output is assumed.
/// The output may be approximate and need not be deterministic.
pub trait LineDetector {
    /// Detect segments in `buffer`.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectionError`] if detection cannot complete.
    fn detect(&self, buffer: &PixelBuffer) -> Result<Vec<RawSegment>, DetectionError>;
}

impl<F> LineDetector for F
where
    F: Fn(&PixelBuffer) -> Result<Vec<RawSegment>, DetectionError>,
{
    fn detect(&self, buffer: &PixelBuffer) -> Result<Vec<RawSegment>, DetectionError> {
        self(buffer)
    }
}

/// Edge-contour based segment detector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContourSegmentDetector {
    config: DetectorConfig,
}

impl ContourSegmentDetector {
    /// Create a detector with the given parameters.
    #[must_use]
    pub const fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl LineDetector for ContourSegmentDetector {
    fn detect(&self, buffer: &PixelBuffer) -> Result<Vec<RawSegment>, DetectionError> {
        let gray = crate::grayscale::to_grayscale(buffer);
        let blurred = crate::blur::gaussian_blur(&gray, self.config.blur_sigma);
        let edges = crate::edge::canny(&blurred, self.config.canny_low, self.config.canny_high);
        let contours = crate::contour::trace_contours(&edges);

        let segments: Vec<RawSegment> = contours
            .iter()
            .map(|c| crate::simplify::simplify(c, self.config.simplify_tolerance))
            .flat_map(|c| c.to_segments())
            .filter(|s| s.length() >= self.config.min_segment_length)
            .collect();

        tracing::debug!(
            width = buffer.width(),
            height = buffer.height(),
            contours = contours.len(),
            segments = segments.len(),
            "detected segments",
        );

        Ok(segments)
    }
}

/// Check the detector contract: every coordinate finite and inside the
/// image.
///
/// # Errors
///
/// Returns [`DetectionError::OutOfBounds`] naming the first offending
/// segment.
pub fn validate_segments(
    segments: &[RawSegment],
    dimensions: Dimensions,
) -> Result<(), DetectionError> {
    match segments
        .iter()
        .position(|s| !dimensions.contains(s.start) || !dimensions.contains(s.end))
    {
        Some(index) => Err(DetectionError::OutOfBounds {
            index,
            width: dimensions.width,
            height: dimensions.height,
        }),
        None => Ok(()),
    }
}
