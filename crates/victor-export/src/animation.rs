//! Progressive reveal of a rendered drawing.
//!
//! The whole drawing is one path. Setting its dash pattern to a single
//! dash as long as the longest subpath and sliding the dash offset from
//! that length down to zero draws every subpath from its start at the same
//! speed. Shorter subpaths finish early and stay drawn.
//!
//! Time comes from a [`Clock`] so the animation state can be driven by a
//! fake clock in tests and by `performance.now()` in a browser.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use victor_pipeline::{Dimensions, SegmentGroup};

use crate::path::{build_path_data, subpath_length};

/// Abstraction over a monotonic time source.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time passed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by `web_time::Instant`: `std::time::Instant` on
/// native targets, `performance.now()` on WASM.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> Self::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Timing curve of the reveal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    /// Constant drawing speed.
    Linear,
    /// Slow start and end, `cubic-bezier(0.42, 0, 0.58, 1)`.
    #[default]
    EaseInOut,
}

impl Easing {
    /// Control points of the ease-in-out curve.
    const EASE_IN_OUT: [f64; 4] = [0.42, 0.0, 0.58, 1.0];

    /// Map linear progress in `[0, 1]` to eased progress in `[0, 1]`.
    /// Input outside the range is clamped.
    #[must_use]
    pub fn apply(self, progress: f64) -> f64 {
        let t = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        match self {
            Self::Linear => t,
            Self::EaseInOut => {
                let [x1, y1, x2, y2] = Self::EASE_IN_OUT;
                cubic_bezier(x1, y1, x2, y2, t)
            }
        }
    }

    /// CSS `transition-timing-function` name.
    #[must_use]
    pub const fn css_name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseInOut => "ease-in-out",
        }
    }

    /// SMIL `keySplines` value, for spline interpolation.
    #[must_use]
    pub const fn key_splines(self) -> Option<&'static str> {
        match self {
            Self::Linear => None,
            Self::EaseInOut => Some("0.42 0 0.58 1"),
        }
    }
}

/// Evaluate a CSS-style cubic Bezier timing function at `x`.
///
/// The curve runs from `(0, 0)` to `(1, 1)`; its x component is monotonic
/// for control x values in `[0, 1]`, so bisection finds the parameter.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    let bezier = |p1: f64, p2: f64, t: f64| {
        let u = 1.0 - t;
        (3.0 * u * u * t).mul_add(p1, (3.0 * u * t * t).mul_add(p2, t * t * t))
    };

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    for _ in 0..48 {
        let mid = 0.5 * (lo + hi);
        if bezier(x1, x2, mid) < x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    bezier(y1, y2, 0.5 * (lo + hi))
}

/// Parameters of the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Wall-clock time for the longest subpath to finish drawing,
    /// serialized as fractional seconds.
    #[serde(with = "duration_serde")]
    pub duration: Duration,

    /// Timing curve.
    pub easing: Easing,
}

impl RevealConfig {
    /// Default reveal duration.
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            duration: Self::DEFAULT_DURATION,
            easing: Easing::default(),
        }
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Dash geometry and timing for one reveal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevealAnimation {
    dash_length: f64,
    #[serde(with = "duration_serde")]
    duration: Duration,
    easing: Easing,
}

impl RevealAnimation {
    /// Reveal with an explicit dash length.
    #[must_use]
    pub const fn new(dash_length: f64, config: RevealConfig) -> Self {
        Self {
            dash_length,
            duration: config.duration,
            easing: config.easing,
        }
    }

    /// Reveal sized to the longest subpath of `groups`.
    #[must_use]
    pub fn for_groups(groups: &[SegmentGroup], config: RevealConfig) -> Self {
        let dash_length = groups.iter().map(subpath_length).fold(0.0, f64::max);
        Self::new(dash_length, config)
    }

    /// Length of the single dash, and of the gap after it.
    #[must_use]
    pub const fn dash_length(&self) -> f64 {
        self.dash_length
    }

    /// Time for the offset to reach zero.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Timing curve.
    #[must_use]
    pub const fn easing(&self) -> Easing {
        self.easing
    }

    /// Dash offset after `elapsed`: the full dash length at the start,
    /// zero once the duration has passed.
    #[must_use]
    pub fn dash_offset_at(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.dash_length * (1.0 - self.easing.apply(progress))
    }

    /// Whether the reveal is complete after `elapsed`.
    #[must_use]
    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}

/// Output of [`PathRenderer::render`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPath {
    data: String,
    dimensions: Dimensions,
    subpaths: usize,
    total_length: f64,
    animation: RevealAnimation,
}

impl RenderedPath {
    /// Build path data and reveal geometry for `groups`.
    #[must_use]
    pub fn new(groups: &[SegmentGroup], dimensions: Dimensions, config: RevealConfig) -> Self {
        Self {
            data: build_path_data(groups),
            dimensions,
            subpaths: groups.iter().filter(|g| !g.is_empty()).count(),
            total_length: groups.iter().map(subpath_length).sum(),
            animation: RevealAnimation::for_groups(groups, config),
        }
    }

    /// The path `d` attribute.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Size of the drawing area.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of non-empty subpaths.
    #[must_use]
    pub const fn subpaths(&self) -> usize {
        self.subpaths
    }

    /// Combined length of every subpath.
    #[must_use]
    pub const fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Reveal geometry and timing.
    #[must_use]
    pub const fn animation(&self) -> &RevealAnimation {
        &self.animation
    }
}

/// Holds the currently displayed drawing and its running reveal.
///
/// Rendering replaces whatever was displayed before and restarts the
/// reveal from the beginning.
#[derive(Debug)]
pub struct PathRenderer<C: Clock = SystemClock> {
    clock: C,
    config: RevealConfig,
    current: Option<(RenderedPath, C::Instant)>,
}

impl PathRenderer<SystemClock> {
    /// Renderer driven by the system clock.
    #[must_use]
    pub const fn new(config: RevealConfig) -> Self {
        Self::with_clock(SystemClock, config)
    }
}

impl<C: Clock> PathRenderer<C> {
    /// Renderer driven by `clock`.
    #[must_use]
    pub const fn with_clock(clock: C, config: RevealConfig) -> Self {
        Self {
            clock,
            config,
            current: None,
        }
    }

    /// Display `groups`, discarding the previous drawing, and start a
    /// fresh reveal.
    pub fn render(&mut self, groups: &[SegmentGroup], dimensions: Dimensions) -> &RenderedPath {
        self.reset();
        let rendered = RenderedPath::new(groups, dimensions, self.config);
        tracing::debug!(
            subpaths = rendered.subpaths(),
            dash_length = rendered.animation().dash_length(),
            "reveal started",
        );
        let (rendered, _) = self.current.insert((rendered, self.clock.now()));
        rendered
    }

    /// Drop the current drawing and its reveal.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// The current drawing, if any.
    #[must_use]
    pub fn rendered(&self) -> Option<&RenderedPath> {
        self.current.as_ref().map(|(rendered, _)| rendered)
    }

    /// Time since the current reveal started.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.current
            .as_ref()
            .map(|(_, started)| self.clock.elapsed(started))
    }

    /// Dash offset to apply now, or `None` when nothing is displayed.
    #[must_use]
    pub fn dash_offset(&self) -> Option<f64> {
        let (rendered, started) = self.current.as_ref()?;
        Some(
            rendered
                .animation()
                .dash_offset_at(self.clock.elapsed(started)),
        )
    }

    /// Whether the current reveal has completed. `false` when nothing is
    /// displayed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current.as_ref().is_some_and(|(rendered, started)| {
            rendered
                .animation()
                .is_finished(self.clock.elapsed(started))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use victor_pipeline::RawSegment;

    use super::*;

    /// Clock that only moves when told to.
    #[derive(Debug, Default)]
    struct ManualClock {
        current: Cell<Duration>,
    }

    impl ManualClock {
        fn advance(&self, by: Duration) {
            self.current.set(self.current.get() + by);
        }
    }

    impl Clock for &ManualClock {
        type Instant = Duration;

        fn now(&self) -> Duration {
            self.current.get()
        }

        fn elapsed(&self, since: &Duration) -> Duration {
            self.current.get().saturating_sub(*since)
        }
    }

    const DIMS: Dimensions = Dimensions {
        width: 100,
        height: 100,
    };

    fn groups() -> Vec<SegmentGroup> {
        vec![
            SegmentGroup::starting_with(RawSegment::from_coords(0.0, 0.0, 40.0, 0.0)),
            SegmentGroup::starting_with(RawSegment::from_coords(0.0, 10.0, 10.0, 10.0)),
        ]
    }

    fn linear(secs: u64) -> RevealConfig {
        RevealConfig {
            duration: Duration::from_secs(secs),
            easing: Easing::Linear,
        }
    }

    #[test]
    fn easing_endpoints_and_symmetry() {
        for easing in [Easing::Linear, Easing::EaseInOut] {
            assert!(easing.apply(0.0).abs() < 1e-9);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9);
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-6);
            assert!((easing.apply(2.0) - 1.0).abs() < 1e-9);
            assert!(easing.apply(-1.0).abs() < 1e-9);
        }
        assert!(Easing::EaseInOut.apply(0.2) < 0.2);
        assert!(Easing::EaseInOut.apply(0.8) > 0.8);
    }

    #[test]
    fn ease_in_out_is_monotonic() {
        let samples: Vec<f64> = (0..=100)
            .map(|i| Easing::EaseInOut.apply(f64::from(i) / 100.0))
            .collect();
        assert!(samples.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn dash_length_is_longest_subpath() {
        let animation = RevealAnimation::for_groups(&groups(), RevealConfig::default());
        assert!((animation.dash_length() - 40.0).abs() < 1e-9);
        assert_eq!(animation.duration(), Duration::from_secs(5));
        assert_eq!(animation.easing(), Easing::EaseInOut);
    }

    #[test]
    fn offset_runs_from_dash_length_to_zero() {
        let animation = RevealAnimation::new(40.0, linear(4));
        assert!((animation.dash_offset_at(Duration::ZERO) - 40.0).abs() < 1e-9);
        assert!((animation.dash_offset_at(Duration::from_secs(1)) - 30.0).abs() < 1e-9);
        assert!(animation.dash_offset_at(Duration::from_secs(4)).abs() < 1e-9);
        assert!(animation.dash_offset_at(Duration::from_secs(60)).abs() < 1e-9);
        assert!(animation.is_finished(Duration::from_secs(4)));
        assert!(!animation.is_finished(Duration::from_secs(3)));
    }

    #[test]
    fn zero_duration_is_drawn_immediately() {
        let animation = RevealAnimation::new(40.0, linear(0));
        assert!(animation.dash_offset_at(Duration::ZERO).abs() < f64::EPSILON);
    }

    #[test]
    fn renderer_follows_the_clock() {
        let clock = ManualClock::default();
        let mut renderer = PathRenderer::with_clock(&clock, linear(4));
        assert_eq!(renderer.dash_offset(), None);

        renderer.render(&groups(), DIMS);
        assert!((renderer.dash_offset().unwrap() - 40.0).abs() < 1e-9);

        clock.advance(Duration::from_secs(2));
        assert!((renderer.dash_offset().unwrap() - 20.0).abs() < 1e-9);
        assert!(!renderer.is_finished());

        clock.advance(Duration::from_secs(2));
        assert!(renderer.dash_offset().unwrap().abs() < 1e-9);
        assert!(renderer.is_finished());
    }

    #[test]
    fn render_restarts_the_reveal() {
        let clock = ManualClock::default();
        let mut renderer = PathRenderer::with_clock(&clock, linear(4));
        renderer.render(&groups(), DIMS);
        clock.advance(Duration::from_secs(3));

        let shorter = vec![SegmentGroup::starting_with(RawSegment::from_coords(
            0.0, 0.0, 8.0, 0.0,
        ))];
        let rendered = renderer.render(&shorter, DIMS);
        assert_eq!(rendered.subpaths(), 1);
        assert_eq!(renderer.elapsed(), Some(Duration::ZERO));
        assert!((renderer.dash_offset().unwrap() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_the_drawing() {
        let clock = ManualClock::default();
        let mut renderer = PathRenderer::with_clock(&clock, linear(4));
        renderer.render(&groups(), DIMS);
        renderer.reset();
        assert!(renderer.rendered().is_none());
        assert_eq!(renderer.dash_offset(), None);
        assert!(!renderer.is_finished());
    }

    #[test]
    fn identical_groups_render_identically() {
        let mut renderer = PathRenderer::new(RevealConfig::default());
        let first = renderer.render(&groups(), DIMS).data().to_owned();
        let second = renderer.render(&groups(), DIMS).data().to_owned();
        assert_eq!(first, second);
        assert_eq!(first, "M0,0 L40,0 M0,10 L10,10");
    }

    #[test]
    fn rendered_path_totals() {
        let rendered = RenderedPath::new(&groups(), DIMS, RevealConfig::default());
        assert_eq!(rendered.subpaths(), 2);
        assert!((rendered.total_length() - 50.0).abs() < 1e-9);
        assert_eq!(rendered.dimensions(), DIMS);
    }

    #[test]
    fn reveal_config_json_uses_seconds() {
        let config: RevealConfig =
            serde_json::from_str(r#"{"duration": 2.5, "easing": "linear"}"#).unwrap();
        assert_eq!(config.duration, Duration::from_millis(2500));
        assert_eq!(config.easing, Easing::Linear);

        let json = serde_json::to_value(RevealConfig::default()).unwrap();
        assert_eq!(json, serde_json::json!({"duration": 5.0, "easing": "ease-in-out"}));
    }
}
