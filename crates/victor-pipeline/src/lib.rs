//! victor-pipeline: line segment detection and stitching (sans-IO).
//!
//! Turns an RGBA pixel buffer into ordered polyline groups:
//! detect straight segments -> validate them against the image bounds ->
//! stitch them into as few continuous strokes as possible.
//!
//! This crate has **no I/O dependencies** and no threads. Scheduling jobs
//! across workers lives in `victor-pool`; turning groups into SVG lives in
//! `victor-export`.

pub mod blur;
pub mod config;
pub mod contour;
pub mod detect;
pub mod edge;
pub mod grayscale;
pub mod simplify;
pub mod stitch;
pub mod types;

use rand::Rng;

pub use config::{DetectorConfig, StitchConfig};
pub use detect::{ContourSegmentDetector, LineDetector, validate_segments};
pub use grayscale::decode;
pub use stitch::SegmentStitcher;
pub use types::{
    AcquisitionError, DetectionError, Dimensions, GroupEntry, PixelBuffer, Point, Polyline,
    RawSegment, RgbaImage, SegmentGroup, Vectorized,
};

/// Run one detection + stitch job.
///
/// The detector output is checked against the image bounds before it is
/// stitched, so a misbehaving detector fails the job instead of
/// producing geometry outside the drawing.
///
/// # Errors
///
/// Returns whatever [`DetectionError`] the detector raises, or
/// [`DetectionError::OutOfBounds`] if it breaks the coordinate contract.
pub fn vectorize<D, R>(
    detector: &D,
    stitcher: &SegmentStitcher,
    buffer: &PixelBuffer,
    rng: &mut R,
) -> Result<Vectorized, DetectionError>
where
    D: LineDetector + ?Sized,
    R: Rng + ?Sized,
{
    let segments = detector.detect(buffer)?;
    validate_segments(&segments, buffer.dimensions())?;
    let groups = stitcher.stitch_with_rng(&segments, rng);
    Ok(Vectorized { segments, groups })
}
