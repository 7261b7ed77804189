//! victor: turn images into self-animating SVG line drawings.
//!
//! Decodes every image given on the command line, vectorizes them on a
//! shared worker pool, and reports per-image segment, group and bridge
//! counts. With `--out-dir`, each drawing is written as `<stem>.svg` with
//! an embedded reveal animation.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin victor -- [OPTIONS] <IMAGES>...
//! ```
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG=debug` to see
//! dispatch and completion events. Results go to stdout.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod config;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use futures::executor::block_on;
use futures::future::join_all;
use victor_export::{PathRenderer, RenderedPath, RevealConfig, SvgMetadata, to_svg};
use victor_pipeline::{
    AcquisitionError, ContourSegmentDetector, DetectorConfig, PixelBuffer, StitchConfig,
};
use victor_pool::WorkerPool;

use crate::config::{VictorConfig, config_from_cli};
use crate::report::ImageReport;

/// Turn images into self-animating SVG line drawings.
///
/// Detects straight line segments in each image, stitches them into as
/// few continuous strokes as possible, and prints a summary per image.
#[derive(Parser)]
#[command(name = "victor", version)]
struct Cli {
    /// Input images (PNG, JPEG, BMP, WebP).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Endpoint distance below which segments are joined directly.
    #[arg(long, default_value_t = StitchConfig::DEFAULT_GAP_THRESHOLD)]
    gap_threshold: f64,

    /// Consecutive bridges before a distant segment starts a new stroke.
    #[arg(long, default_value_t = StitchConfig::DEFAULT_MAX_BRIDGES)]
    max_bridges: u32,

    /// Maximum bridge length.
    #[arg(long, default_value_t = StitchConfig::DEFAULT_JITTER)]
    jitter: f64,

    /// Gaussian blur sigma.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_BLUR_SIGMA)]
    blur_sigma: f32,

    /// Canny low threshold.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// RDP simplification tolerance in pixels.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_SIMPLIFY_TOLERANCE)]
    simplify_tolerance: f64,

    /// Drop detected segments shorter than this.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_MIN_SEGMENT_LENGTH)]
    min_segment_length: f64,

    /// Number of execution units. Defaults to 2 on multi-core hosts, else 1.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    workers: Option<usize>,

    /// Seed for bridge jitter. Without it, output varies between runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Reveal duration in seconds.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_DURATION.as_secs_f64())]
    duration: f64,

    /// Reveal timing curve.
    #[arg(long, value_enum, default_value_t = EasingArg::EaseInOut)]
    easing: EasingArg,

    /// Write `<stem>.svg` for every image into this directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Write SVGs fully drawn instead of animated.
    #[arg(long)]
    no_animate: bool,

    /// Print one JSON summary per image instead of a text report.
    #[arg(long)]
    json: bool,

    /// Full configuration as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored. Sections are
    /// `detector`, `stitch`, `pool` and `reveal`.
    #[arg(long)]
    config_json: Option<String>,
}

/// Reveal timing curve selection.
#[derive(Clone, Copy, ValueEnum)]
enum EasingArg {
    /// Constant speed.
    Linear,
    /// Slow start and end.
    EaseInOut,
}

/// Why an image never reached the pool.
#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error("error reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error decoding {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: AcquisitionError,
    },
}

fn load(path: &Path) -> Result<PixelBuffer, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Read {
        path: path.to_owned(),
        source,
    })?;
    victor_pipeline::decode(&bytes).map_err(|source| LoadError::Decode {
        path: path.to_owned(),
        source,
    })
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let pool = match WorkerPool::with_detector(
        ContourSegmentDetector::new(config.detector),
        config.stitch,
        &config.pool,
    ) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error starting worker pool: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(workers = pool.size(), images = cli.images.len(), "starting");

    if let Some(ref dir) = cli.out_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("Error creating {}: {e}", dir.display());
        return ExitCode::FAILURE;
    }

    // Acquisition failures are reported per image; nothing is submitted
    // for them.
    let mut ok = true;
    let mut submitted = Vec::with_capacity(cli.images.len());
    for path in &cli.images {
        match load(path) {
            Ok(buffer) => {
                let dimensions = buffer.dimensions();
                submitted.push((path, dimensions, pool.submit(buffer)));
            }
            Err(e) => {
                eprintln!("{e}");
                ok = false;
            }
        }
    }

    let results = block_on(join_all(
        submitted
            .into_iter()
            .map(|(path, dimensions, handle)| async move { (path, dimensions, handle.await) }),
    ));

    let mut renderer = PathRenderer::new(config.reveal);
    for (path, dimensions, result) in results {
        let vectorized = match result {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Error vectorizing {}: {e}", path.display());
                ok = false;
                continue;
            }
        };

        let rendered = renderer.render(&vectorized.groups, dimensions);
        let report = ImageReport::new(path, &vectorized, rendered);

        if let Some(ref dir) = cli.out_dir
            && !write_svg(dir, path, rendered, &config, !cli.no_animate)
        {
            ok = false;
        }

        if cli.json {
            match serde_json::to_string(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing report: {e}");
                    ok = false;
                }
            }
        } else {
            println!("{report}");
        }
    }

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Write `<stem>.svg` into `dir`. Returns whether the write succeeded.
fn write_svg(
    dir: &Path,
    image: &Path,
    rendered: &RenderedPath,
    config: &VictorConfig,
    animate: bool,
) -> bool {
    let stem = image
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("drawing");
    let svg_path = dir.join(format!("{stem}.svg"));
    let desc = serde_json::to_string(config).unwrap_or_default();
    let metadata = SvgMetadata {
        title: Some(stem),
        description: Some(&desc),
    };
    let svg = to_svg(rendered, &metadata, animate);
    match std::fs::write(&svg_path, &svg) {
        Ok(()) => {
            tracing::info!(path = %svg_path.display(), bytes = svg.len(), "SVG written");
            true
        }
        Err(e) => {
            eprintln!("Error writing SVG to {}: {e}", svg_path.display());
            false
        }
    }
}
