//! Tunable parameters for detection and stitching.
//!
//! Every struct has a `Default` impl built from associated `DEFAULT_*`
//! constants so that CLI flag defaults and library defaults cannot drift
//! apart.

use serde::{Deserialize, Serialize};

/// Parameters for the [`SegmentStitcher`](crate::SegmentStitcher).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Endpoint distance below which two segments are treated as
    /// continuous, in the same units as the segment coordinates.
    pub gap_threshold: f64,

    /// Consecutive bridges allowed before the nearest segment is forced
    /// into a new group.
    pub max_bridges: u32,

    /// Maximum length of a synthetic bridge.
    pub jitter: f64,
}

impl StitchConfig {
    /// Default gap threshold.
    pub const DEFAULT_GAP_THRESHOLD: f64 = 15.0;
    /// Default consecutive bridge limit.
    pub const DEFAULT_MAX_BRIDGES: u32 = 2;
    /// Default bridge jitter magnitude.
    pub const DEFAULT_JITTER: f64 = 5.0;
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            gap_threshold: Self::DEFAULT_GAP_THRESHOLD,
            max_bridges: Self::DEFAULT_MAX_BRIDGES,
            jitter: Self::DEFAULT_JITTER,
        }
    }
}

/// Parameters for the [`ContourSegmentDetector`](crate::ContourSegmentDetector).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Gaussian blur kernel sigma applied before edge detection.
    pub blur_sigma: f32,

    /// Canny low threshold. Clamped to at least
    /// [`edge::MIN_THRESHOLD`](crate::edge::MIN_THRESHOLD) and at most
    /// `canny_high`.
    pub canny_low: f32,

    /// Canny high threshold.
    pub canny_high: f32,

    /// Ramer-Douglas-Peucker tolerance in pixels. Larger values merge
    /// more contour points into each straight segment.
    pub simplify_tolerance: f64,

    /// Segments shorter than this are discarded.
    pub min_segment_length: f64,
}

impl DetectorConfig {
    /// Default blur sigma.
    pub const DEFAULT_BLUR_SIGMA: f32 = 1.4;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default simplification tolerance.
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 2.0;
    /// Default minimum segment length.
    pub const DEFAULT_MIN_SEGMENT_LENGTH: f64 = 2.0;
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
            min_segment_length: Self::DEFAULT_MIN_SEGMENT_LENGTH,
        }
    }
}
