//! victor-export: path data, reveal animation and SVG output (sans-IO).
//!
//! Turns stitched [`SegmentGroup`](victor_pipeline::SegmentGroup)s into a
//! single SVG path whose subpaths are revealed progressively, one stroke
//! per group.

pub mod animation;
pub mod path;
pub mod svg;

pub use animation::{
    Clock, Easing, PathRenderer, RenderedPath, RevealAnimation, RevealConfig, SystemClock,
};
pub use path::{build_group_path_data, build_path_data, subpath_length};
pub use svg::{SvgMetadata, to_svg};
