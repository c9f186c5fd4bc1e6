//! Metrics sink that remembers what it was told.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::metrics::MetricsSink;

#[derive(Debug, Default)]
struct Recorded {
    counters: HashMap<String, u64>,
    observations: Vec<(String, f64)>,
}

/// In-memory [`MetricsSink`] for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingMetrics {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Total of all increments recorded under `name`.
    pub fn count(&self, name: &str) -> u64 {
        self.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Values observed under `name`, in order.
    pub fn observations(&self, name: &str) -> Vec<f64> {
        self.lock()
            .observations
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl MetricsSink for RecordingMetrics {
    fn increment(&self, name: &str, amount: u64) {
        *self.lock().counters.entry(name.to_string()).or_insert(0) += amount;
    }

    fn observe(&self, name: &str, value: f64) {
        self.lock().observations.push((name.to_string(), value));
    }
}
