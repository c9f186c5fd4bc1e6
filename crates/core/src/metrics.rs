//! Metrics for the run pipeline.
//!
//! Pipeline code reports through the [`MetricsSink`] trait using the event
//! names in [`events`]; [`PrometheusMetrics`] maps them onto the static
//! collectors below.

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts};

/// Event names emitted by the pipeline.
pub mod events {
    pub const CACHE_HIT: &str = "cache_hit";
    pub const CACHE_MISS: &str = "cache_miss";
    pub const ITEM_FINISHED: &str = "item_finished";
    pub const ITEM_FAILED: &str = "item_failed";
    pub const BATCH_UPLOADED: &str = "batch_uploaded";
    pub const BATCH_FAILED: &str = "batch_failed";
    pub const RUN_COMPLETED: &str = "run_completed";
    pub const RUN_TIMED_OUT: &str = "run_timed_out";

    /// Observation: archive size of an uploaded batch, in bytes.
    pub const BATCH_SIZE_BYTES: &str = "batch_size_bytes";
    /// Observation: wall time of a run, in seconds.
    pub const RUN_DURATION_SECONDS: &str = "run_duration_seconds";
}

/// Destination for pipeline counters and observations.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, amount: u64);

    fn observe(&self, _name: &str, _value: f64) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _name: &str, _amount: u64) {}
}

/// Reports into the process-wide Prometheus collectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl MetricsSink for PrometheusMetrics {
    fn increment(&self, name: &str, amount: u64) {
        PIPELINE_EVENTS.with_label_values(&[name]).inc_by(amount);
    }

    fn observe(&self, name: &str, value: f64) {
        match name {
            events::BATCH_SIZE_BYTES => BATCH_SIZE_BYTES.observe(value),
            events::RUN_DURATION_SECONDS => RUN_DURATION.observe(value),
            _ => {}
        }
    }
}

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Pipeline events by name.
pub static PIPELINE_EVENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("packforge_pipeline_events_total", "Total pipeline events"),
        &["event"],
    )
    .unwrap()
});

/// Size of uploaded batch archives.
pub static BATCH_SIZE_BYTES: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("packforge_batch_size_bytes", "Size of uploaded batch archives")
            .buckets(vec![
                65_536.0,
                1_048_576.0,
                5_242_880.0,
                10_485_760.0,
                26_214_400.0,
                52_428_800.0,
                104_857_600.0,
            ]),
    )
    .unwrap()
});

/// Run wall time.
pub static RUN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("packforge_run_duration_seconds", "Duration of runs")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0]),
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PIPELINE_EVENTS.clone()),
        Box::new(BATCH_SIZE_BYTES.clone()),
        Box::new(RUN_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_sink_counts_events() {
        let sink = PrometheusMetrics;
        let before = PIPELINE_EVENTS
            .with_label_values(&[events::BATCH_UPLOADED])
            .get();
        sink.increment(events::BATCH_UPLOADED, 2);
        let after = PIPELINE_EVENTS
            .with_label_values(&[events::BATCH_UPLOADED])
            .get();
        assert_eq!(after - before, 2);
    }

    #[test]
    fn test_prometheus_sink_observes_known_histograms() {
        let sink = PrometheusMetrics;
        let before = BATCH_SIZE_BYTES.get_sample_count();
        sink.observe(events::BATCH_SIZE_BYTES, 1024.0);
        sink.observe("unknown", 1.0);
        assert_eq!(BATCH_SIZE_BYTES.get_sample_count(), before + 1);
    }

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        assert!(!registry.gather().is_empty());
    }
}
