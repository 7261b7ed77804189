//! Per-image summaries printed to stdout.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use victor_export::RenderedPath;
use victor_pipeline::Vectorized;

/// What one image turned into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageReport {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub segments: usize,
    pub groups: usize,
    pub bridges: usize,
    /// Total drawn length in pixels, bridges and joins included.
    pub draw_length: f64,
    /// Length of the longest stroke, which sets the reveal's dash.
    pub dash_length: f64,
}

impl ImageReport {
    pub fn new(image: &Path, vectorized: &Vectorized, rendered: &RenderedPath) -> Self {
        let dimensions = rendered.dimensions();
        Self {
            image: image.display().to_string(),
            width: dimensions.width,
            height: dimensions.height,
            segments: vectorized.segments.len(),
            groups: vectorized.groups.len(),
            bridges: vectorized.bridge_count(),
            draw_length: rendered.total_length(),
            dash_length: rendered.animation().dash_length(),
        }
    }
}

impl fmt::Display for ImageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}x{}, {} segments, {} groups, {} bridges, draw length {:.1}px",
            self.image,
            self.width,
            self.height,
            self.segments,
            self.groups,
            self.bridges,
            self.draw_length,
        )
    }
}
