//! Pool sizing and seeding.

use serde::{Deserialize, Serialize};

/// Parameters for [`WorkerPool::with_detector`](crate::WorkerPool::with_detector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of execution units. Must be at least 1.
    pub size: usize,

    /// Base seed for bridge jitter. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl PoolConfig {
    /// Size used on hosts with more than one CPU.
    pub const MULTI_CORE_SIZE: usize = 2;
    /// Size used on single-CPU hosts, or when the CPU count is unknown.
    pub const SINGLE_CORE_SIZE: usize = 1;

    /// Pool size for this host: two units when more than one CPU is
    /// available, otherwise one.
    #[must_use]
    pub fn default_size() -> usize {
        std::thread::available_parallelism().map_or(Self::SINGLE_CORE_SIZE, |n| {
            Self::size_for_parallelism(n.get())
        })
    }

    /// Pool size for a host reporting `cpus` CPUs.
    #[must_use]
    pub const fn size_for_parallelism(cpus: usize) -> usize {
        if cpus > 1 {
            Self::MULTI_CORE_SIZE
        } else {
            Self::SINGLE_CORE_SIZE
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: Self::default_size(),
            seed: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn size_follows_cpu_count() {
        assert_eq!(PoolConfig::size_for_parallelism(0), 1);
        assert_eq!(PoolConfig::size_for_parallelism(1), 1);
        assert_eq!(PoolConfig::size_for_parallelism(2), 2);
        assert_eq!(PoolConfig::size_for_parallelism(64), 2);
    }

    #[test]
    fn default_size_is_one_or_two() {
        let size = PoolConfig::default().size;
        assert!(size == 1 || size == 2);
    }

    #[test]
    fn json_overrides_size() {
        let config: PoolConfig = serde_json::from_str(r#"{"size": 4, "seed": 9}"#).unwrap();
        assert_eq!(config.size, 4);
        assert_eq!(config.seed, Some(9));
    }
}
