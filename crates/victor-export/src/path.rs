//! SVG path data for stitched groups.
//!
//! Each group becomes one subpath: a move to the first segment's start and
//! a line to its end, then for every later segment (detected or bridge) a
//! line to its start and a line to its end. Lining to the start of each
//! later segment draws the small gap the stitcher accepted between
//! consecutive segments.

use svg::node::Value;
use svg::node::element::path::Data;
use victor_pipeline::{Point, SegmentGroup};

/// Build the `d` string for one group.
///
/// Returns an empty string for an empty group.
///
/// # Examples
///
/// ```
/// use victor_pipeline::{RawSegment, SegmentGroup};
/// use victor_export::build_group_path_data;
///
/// let group = SegmentGroup::starting_with(RawSegment::from_coords(10.0, 20.0, 30.0, 40.0));
/// assert_eq!(build_group_path_data(&group), "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_group_path_data(group: &SegmentGroup) -> String {
    let mut points = group_points(group);
    let Some(first) = points.next() else {
        return String::new();
    };

    let data = points.fold(Data::new().move_to((first.x, first.y)), |data, p| {
        data.line_to((p.x, p.y))
    });
    String::from(Value::from(data))
}

/// Build the `d` string for a whole drawing: every group's subpath in
/// order, separated by single spaces.
#[must_use]
pub fn build_path_data(groups: &[SegmentGroup]) -> String {
    groups
        .iter()
        .map(build_group_path_data)
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Length of the polyline a group renders as.
///
/// Sums the distances between consecutive path points, so the joins
/// between segments count as well as the segments themselves.
#[must_use]
pub fn subpath_length(group: &SegmentGroup) -> f64 {
    let points: Vec<Point> = group_points(group).collect();
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Path points of a group: start and end of every segment. The first
/// start is the move target.
fn group_points(group: &SegmentGroup) -> impl Iterator<Item = Point> + '_ {
    group.segments().flat_map(|s| [s.start, s.end])
}
