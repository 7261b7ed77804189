//! Assembling the run configuration from CLI flags or JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use victor_export::{Easing, RevealConfig};
use victor_pipeline::{DetectorConfig, StitchConfig};
use victor_pool::PoolConfig;

use crate::{Cli, EasingArg};

/// Everything a run needs, as accepted by `--config-json`.
///
/// Missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictorConfig {
    pub detector: DetectorConfig,
    pub stitch: StitchConfig,
    pub pool: PoolConfig,
    pub reveal: RevealConfig,
}

/// Errors turning CLI input into a [`VictorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error parsing --config-json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("--duration must be a finite, non-negative number of seconds, got {0}")]
    Duration(f64),
}

/// Build a [`VictorConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
pub fn config_from_cli(cli: &Cli) -> Result<VictorConfig, ConfigError> {
    if let Some(ref json) = cli.config_json {
        return Ok(serde_json::from_str(json)?);
    }

    let duration =
        Duration::try_from_secs_f64(cli.duration).map_err(|_| ConfigError::Duration(cli.duration))?;

    Ok(VictorConfig {
        detector: DetectorConfig {
            blur_sigma: cli.blur_sigma,
            canny_low: cli.canny_low,
            canny_high: cli.canny_high,
            simplify_tolerance: cli.simplify_tolerance,
            min_segment_length: cli.min_segment_length,
        },
        stitch: StitchConfig {
            gap_threshold: cli.gap_threshold,
            max_bridges: cli.max_bridges,
            jitter: cli.jitter,
        },
        pool: PoolConfig {
            size: cli.workers.unwrap_or_else(PoolConfig::default_size),
            seed: cli.seed,
        },
        reveal: RevealConfig {
            duration,
            easing: match cli.easing {
                EasingArg::Linear => Easing::Linear,
                EasingArg::EaseInOut => Easing::EaseInOut,
            },
        },
    })
}
