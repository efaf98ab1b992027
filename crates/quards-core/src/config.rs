//! # Exploration Configuration
//!
//! Run-time knobs for the driver. Deserializable so the binary can read them
//! from the `[explore]` table of its TOML config.

use crate::{QuardsError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default exclusive depth bound.
pub const DEFAULT_MAX_DEPTH: u64 = 10;

/// Default number of parsed parent states kept by each worker.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Default wait between barrier checks while other workers hold claims.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Settings for one exploration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreConfig {
    /// Exclusive upper bound: depths `start_depth..max_depth` are explored.
    pub max_depth: u64,
    /// First depth to claim work from.
    pub start_depth: u64,
    /// Number of concurrent driver loops.
    pub workers: usize,
    /// Parent states cached per worker.
    pub cache_capacity: usize,
    /// Barrier poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            start_depth: 0,
            workers: 1,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ExploreConfig {
    /// Config exploring depths `0..max_depth` with one worker.
    #[must_use]
    pub fn with_max_depth(max_depth: u64) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Reject settings the driver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(QuardsError::ConfigError(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.start_depth > self.max_depth {
            return Err(QuardsError::ConfigError(format!(
                "start_depth {} is past max_depth {}",
                self.start_depth, self.max_depth
            )));
        }
        Ok(())
    }

    /// Barrier poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
