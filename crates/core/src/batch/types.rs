//! Types for batch accumulation and packaging.

use serde::Serialize;
use std::path::PathBuf;

/// Result of offering an artifact to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The artifact joined the pending batch.
    Added,
    /// The artifact was not added; flush the pending batch and offer it again.
    MustFlush,
}

/// A group of artifacts taken out of the accumulator for packaging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// 0-based sequence number within the run.
    pub index: u64,
    pub artifacts: Vec<PathBuf>,
    /// Sum of artifact sizes at registration time.
    pub size_bytes: u64,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Point-in-time view of the accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccumulatorSnapshot {
    /// Index the next non-empty batch will be given.
    pub index: u64,
    pub pending_files: usize,
    pub pending_bytes: u64,
}
