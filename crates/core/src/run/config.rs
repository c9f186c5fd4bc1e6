//! Run configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tuning knobs for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Largest collection accepted.
    #[serde(default = "default_max_items")]
    pub max_items_per_run: usize,

    /// Number of concurrent workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Byte limit a multi-file batch stays below.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size_bytes: u64,

    /// Wall time after which a run is abandoned.
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    /// Capacity of the work queue between feeder and workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Period of the supervisor check and the progress report.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Parent of the per-run temp folders.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Keep decoded Lottie JSON next to the rendered GIF in the archive.
    #[serde(default)]
    pub preserve_intermediate: bool,

    /// Store fresh conversions in the content cache. Lookups happen either way.
    #[serde(skip, default = "default_cache_writes")]
    pub cache_writes: bool,
}

fn default_max_items() -> usize {
    120
}

fn default_worker_count() -> usize {
    4
}

fn default_max_batch_size() -> u64 {
    50 * 1024 * 1024
}

fn default_deadline() -> u64 {
    600
}

fn default_queue_capacity() -> usize {
    10
}

fn default_tick_interval() -> u64 {
    1000
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("packforge-runs")
}

fn default_cache_writes() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_items_per_run: default_max_items(),
            worker_count: default_worker_count(),
            max_batch_size_bytes: default_max_batch_size(),
            deadline_secs: default_deadline(),
            queue_capacity: default_queue_capacity(),
            tick_interval_ms: default_tick_interval(),
            temp_dir: default_temp_dir(),
            preserve_intermediate: false,
            cache_writes: default_cache_writes(),
        }
    }
}

impl RunConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_max_batch_size(mut self, bytes: u64) -> Self {
        self.max_batch_size_bytes = bytes;
        self
    }

    pub fn with_deadline_secs(mut self, secs: u64) -> Self {
        self.deadline_secs = secs;
        self
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items_per_run = max;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_preserve_intermediate(mut self, enabled: bool) -> Self {
        self.preserve_intermediate = enabled;
        self
    }

    pub fn with_cache_writes(mut self, enabled: bool) -> Self {
        self.cache_writes = enabled;
        self
    }
}
