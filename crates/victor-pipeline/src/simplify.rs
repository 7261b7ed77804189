//! Ramer-Douglas-Peucker simplification.
//!
//! Traced contours follow the pixel grid one step at a time. Simplifying
//! them first turns long straight runs into single segments, which is
//! what the reference detector reports.

use crate::types::{Point, Polyline};

/// Simplify a polyline, dropping points within `tolerance` pixels of the
/// chord between their kept neighbours.
///
/// The first and last points are always kept. Polylines with fewer than
/// three points are returned unchanged.
#[must_use = "returns the simplified polyline"]
pub fn simplify(polyline: &Polyline, tolerance: f64) -> Polyline {
    let points = polyline.points();
    if points.len() < 3 {
        return polyline.clone();
    }

    let last = points.len() - 1;
    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[last] = true;

    // Explicit stack of (start, end) spans; long contours would otherwise
    // recurse as deep as their point count.
    let mut spans = vec![(0, last)];
    while let Some((start, end)) = spans.pop() {
        if end <= start + 1 {
            continue;
        }

        let (far_idx, far_dist) = ((start + 1)..end)
            .map(|i| (i, perpendicular_distance(points[i], points[start], points[end])))
            .fold((start, 0.0), |best, cand| if cand.1 > best.1 { cand } else { best });

        if far_dist > tolerance {
            kept[far_idx] = true;
            spans.push((start, far_idx));
            spans.push((far_idx, end));
        }
    }

    Polyline::new(
        points
            .iter()
            .zip(&kept)
            .filter_map(|(&p, &k)| k.then_some(p))
            .collect(),
    )
}

/// Distance from `p` to the infinite line through `a` and `b`, or to `a`
/// when the two coincide.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
