//! Contour tracing: extract polylines from a binary edge map.

use image::GrayImage;

use crate::types::{Point, Polyline};

/// Trace the borders of white regions in `edges`.
///
/// Uses Suzuki-Abe border following via
/// [`imageproc::contours::find_contours`]. On one-pixel-wide Canny edges
/// this yields doubled borders; simplification downstream collapses most
/// of them. Contours with fewer than two points are dropped.
#[must_use = "returns the traced contours"]
pub fn trace_contours(edges: &GrayImage) -> Vec<Polyline> {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(edges);

    contours
        .into_iter()
        .filter(|c| c.points.len() >= 2)
        .map(|c| {
            Polyline::new(
                c.points
                    .into_iter()
                    .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                    .collect(),
            )
        })
        .collect()
}
