//! Shared types for the victor vectorization pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so callers can hand decoded images to
/// [`PixelBuffer::from_rgba`] without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A straight line segment reported by a line detector.
///
/// Segments are undirected in meaning: the stitcher is free to flip
/// them. They are stored as a directed `start -> end` pair so that a
/// segment placed into a [`SegmentGroup`] carries its drawing direction.
///
/// On the wire a segment is the flat array `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct RawSegment {
    /// First endpoint.
    pub start: Point,
    /// Second endpoint.
    pub end: Point,
}

impl RawSegment {
    /// Create a segment from its two endpoints.
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Create a segment from flat `x1, y1, x2, y2` coordinates.
    #[must_use]
    pub const fn from_coords(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    /// The same segment drawn in the opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self::new(self.end, self.start)
    }

    /// Euclidean length of the segment.
    #[must_use]
    pub fn length(self) -> f64 {
        self.start.distance(self.end)
    }

    /// Returns `true` when `other` is this segment in either direction.
    #[must_use]
    pub fn same_undirected(self, other: Self) -> bool {
        self == other || self == other.reversed()
    }

    const fn coords(self) -> [f64; 4] {
        [self.start.x, self.start.y, self.end.x, self.end.y]
    }
}

impl From<[f64; 4]> for RawSegment {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self::from_coords(x1, y1, x2, y2)
    }
}

impl From<RawSegment> for [f64; 4] {
    fn from(segment: RawSegment) -> Self {
        segment.coords()
    }
}

/// One oriented entry of a [`SegmentGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupEntry {
    /// A segment produced by the detector, possibly reversed.
    Detected(RawSegment),
    /// A jittered connector inserted by the stitcher to carry the
    /// stroke across a gap. Never replaces a detected segment.
    Bridge(RawSegment),
}

impl GroupEntry {
    /// The oriented segment, regardless of where it came from.
    #[must_use]
    pub const fn segment(self) -> RawSegment {
        match self {
            Self::Detected(segment) | Self::Bridge(segment) => segment,
        }
    }

    /// Returns `true` for synthetic bridge entries.
    #[must_use]
    pub const fn is_bridge(self) -> bool {
        matches!(self, Self::Bridge(_))
    }
}

/// An ordered chain of oriented segments forming one drawable polyline.
///
/// Consecutive entries are contiguous: each entry starts within the
/// stitcher's gap threshold of where the previous one ended, or is
/// reached through an explicit [`GroupEntry::Bridge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentGroup(Vec<GroupEntry>);

impl SegmentGroup {
    /// Create a group from its entries.
    #[must_use]
    pub const fn new(entries: Vec<GroupEntry>) -> Self {
        Self(entries)
    }

    /// Start a group with a single detected segment.
    #[must_use]
    pub fn starting_with(segment: RawSegment) -> Self {
        Self(vec![GroupEntry::Detected(segment)])
    }

    /// Append an entry at the end of the chain.
    pub fn push(&mut self, entry: GroupEntry) {
        self.0.push(entry);
    }

    /// Returns `true` if the group has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries, bridges included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// All entries in drawing order.
    #[must_use]
    pub fn entries(&self) -> &[GroupEntry] {
        &self.0
    }

    /// All oriented segments in drawing order, bridges included.
    pub fn segments(&self) -> impl Iterator<Item = RawSegment> + '_ {
        self.0.iter().map(|entry| entry.segment())
    }

    /// Only the detected segments, in drawing order.
    pub fn detected(&self) -> impl Iterator<Item = RawSegment> + '_ {
        self.0.iter().filter_map(|entry| match entry {
            GroupEntry::Detected(segment) => Some(*segment),
            GroupEntry::Bridge(_) => None,
        })
    }

    /// Number of synthetic bridges in the group.
    #[must_use]
    pub fn bridge_count(&self) -> usize {
        self.0.iter().filter(|entry| entry.is_bridge()).count()
    }
}

/// A sequence of connected points.
///
/// Intermediate shape produced by contour tracing inside the reference
/// detector before it is cut into [`RawSegment`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Cut the polyline into one segment per consecutive point pair.
    #[must_use]
    pub fn to_segments(&self) -> Vec<RawSegment> {
        self.0
            .windows(2)
            .map(|pair| RawSegment::new(pair[0], pair[1]))
            .collect()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Returns `true` when `p` lies within `[0, width] x [0, height]`.
    #[must_use]
    pub fn contains(self, p: Point) -> bool {
        (0.0..=f64::from(self.width)).contains(&p.x)
            && (0.0..=f64::from(self.height)).contains(&p.y)
    }
}

/// Immutable RGBA pixel data handed to a detector.
///
/// The length of `pixels` is always `width * height * 4`; the
/// constructors reject anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::BufferSize`] if `pixels` does not hold
    /// exactly `width * height` RGBA pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AcquisitionError> {
        let expected = usize::try_from(u64::from(width) * u64::from(height) * 4).ok();
        if expected != Some(pixels.len()) {
            return Err(AcquisitionError::BufferSize {
                width,
                height,
                expected: expected.unwrap_or(usize::MAX),
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Take ownership of a decoded RGBA image.
    #[must_use]
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the buffer, returning the raw RGBA bytes.
    #[must_use]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// The outcome of one detection + stitch job.
///
/// `segments` is the detector output exactly as reported; `groups` is
/// the stitched drawing order covering every one of those segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vectorized {
    /// Raw detector output.
    pub segments: Vec<RawSegment>,
    /// Stitched polylines in drawing order.
    pub groups: Vec<SegmentGroup>,
}

impl Vectorized {
    /// Total number of synthetic bridges across all groups.
    #[must_use]
    pub fn bridge_count(&self) -> usize {
        self.groups.iter().map(SegmentGroup::bridge_count).sum()
    }
}

/// Errors raised while turning an image source into a [`PixelBuffer`].
///
/// These surface directly to the caller; no task is submitted.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Raw pixel data does not match the claimed dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        /// Claimed width.
        width: u32,
        /// Claimed height.
        height: u32,
        /// Required byte count.
        expected: usize,
        /// Byte count actually supplied.
        actual: usize,
    },
}

/// Errors raised while detecting segments in a [`PixelBuffer`].
///
/// Serializable so an execution unit can report it across a message
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum DetectionError {
    /// The detector itself failed.
    #[error("line detection failed: {0}")]
    Failed(String),

    /// The detector reported a segment outside the image bounds.
    #[error("segment {index} lies outside the {width}x{height} image")]
    OutOfBounds {
        /// Index of the offending segment in the detector output.
        index: usize,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
}
