//! Segment stitching: chain an unordered bag of segments into polylines.
//!
//! An animated stroke looks best with as few pen-lifts as possible. The
//! [`SegmentStitcher`] walks greedily from segment to nearest segment,
//! flipping each one so that it continues from the current pen position.
//! Small gaps are crossed directly. Larger gaps are first probed with up to
//! [`StitchConfig::max_bridges`] short jittered bridges; if the pen is still
//! stranded after that, the nearest segment starts a new group.
//!
//! # Termination
//!
//! Every iteration either consumes one detected segment or inserts a
//! bridge, and bridges are capped per stretch, so a detected segment is
//! consumed at least once every `max_bridges + 1` iterations. Each
//! iteration scans the remaining segments, giving `O(n^2)` total work.
//!
//! # Determinism
//!
//! The nearest-segment search visits segments in input order and keeps
//! the first minimum it sees, so ties go to the lowest index. Within one
//! segment a tie between its endpoints keeps the segment's own direction.
//! The only other input is the random source used for bridge jitter,
//! which callers can pin via [`SegmentStitcher::stitch_with_rng`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::StitchConfig;
use crate::types::{GroupEntry, Point, RawSegment, SegmentGroup};

/// Greedy nearest-neighbour segment chainer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SegmentStitcher {
    config: StitchConfig,
}

/// The closest remaining segment to the pen.
#[derive(Debug, Clone, Copy)]
struct Nearest {
    index: usize,
    distance: f64,
    reversed: bool,
}

impl SegmentStitcher {
    /// Create a stitcher with the given parameters.
    #[must_use]
    pub const fn new(config: StitchConfig) -> Self {
        Self { config }
    }

    /// The parameters this stitcher was built with.
    #[must_use]
    pub const fn config(&self) -> &StitchConfig {
        &self.config
    }

    /// Stitch segments using a freshly seeded, non-deterministic random
    /// source for bridge jitter.
    #[must_use = "returns the stitched groups"]
    pub fn stitch(&self, segments: &[RawSegment]) -> Vec<SegmentGroup> {
        self.stitch_with_rng(segments, &mut StdRng::from_entropy())
    }

    /// Stitch segments into groups, drawing bridge jitter from `rng`.
    ///
    /// Every input segment appears exactly once across the returned
    /// groups, possibly reversed. Empty input yields no groups.
    #[must_use = "returns the stitched groups"]
    pub fn stitch_with_rng<R: Rng + ?Sized>(
        &self,
        segments: &[RawSegment],
        rng: &mut R,
    ) -> Vec<SegmentGroup> {
        let Some((&seed, rest)) = segments.split_first() else {
            return Vec::new();
        };

        let mut remaining = rest.to_vec();
        let mut groups = Vec::new();
        let mut open = SegmentGroup::starting_with(seed);
        let mut current = seed.end;
        let mut bridges = 0_u32;

        while let Some(nearest) = find_nearest(&remaining, current) {
            if nearest.distance < self.config.gap_threshold {
                let segment = take(&mut remaining, nearest);
                current = segment.end;
                open.push(GroupEntry::Detected(segment));
                bridges = 0;
            } else if bridges >= self.config.max_bridges {
                let segment = take(&mut remaining, nearest);
                current = segment.end;
                groups.push(std::mem::replace(
                    &mut open,
                    SegmentGroup::starting_with(segment),
                ));
                bridges = 0;
            } else {
                let bridge = jitter_bridge(current, self.config.jitter, rng);
                current = bridge.end;
                open.push(GroupEntry::Bridge(bridge));
                bridges += 1;
            }
        }
        groups.push(open);

        tracing::trace!(
            segments = segments.len(),
            groups = groups.len(),
            bridges = groups.iter().map(SegmentGroup::bridge_count).sum::<usize>(),
            "stitched segments",
        );

        groups
    }
}

/// Scan `remaining` in order for the segment with an endpoint closest to
/// `current`. Returns `None` only when `remaining` is empty.
fn find_nearest(remaining: &[RawSegment], current: Point) -> Option<Nearest> {
    let mut best: Option<(usize, f64, bool)> = None;

    for (index, segment) in remaining.iter().enumerate() {
        let to_start = current.distance_squared(segment.start);
        let to_end = current.distance_squared(segment.end);
        let (dist, reversed) = if to_end < to_start {
            (to_end, true)
        } else {
            (to_start, false)
        };

        if best.is_none_or(|(_, best_dist, _)| dist < best_dist) {
            best = Some((index, dist, reversed));
        }
    }

    best.map(|(index, dist, reversed)| Nearest {
        index,
        distance: dist.sqrt(),
        reversed,
    })
}

/// Remove the chosen segment from the pool, oriented to continue the pen.
fn take(remaining: &mut Vec<RawSegment>, nearest: Nearest) -> RawSegment {
    let segment = remaining.remove(nearest.index);
    if nearest.reversed {
        segment.reversed()
    } else {
        segment
    }
}

/// A bridge from `from` to a point at most `jitter` away in a random
/// direction.
fn jitter_bridge<R: Rng + ?Sized>(from: Point, jitter: f64, rng: &mut R) -> RawSegment {
    let angle = rng.gen_range(0.0..std::f64::consts::TAU);
    let magnitude = rng.r#gen::<f64>() * jitter.max(0.0);
    let (sin, cos) = angle.sin_cos();
    let to = Point::new(magnitude.mul_add(cos, from.x), magnitude.mul_add(sin, from.y));
    RawSegment::new(from, to)
}
