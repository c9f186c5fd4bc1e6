//! Types describing a run and its outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the supervisor loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every item finished or failed before the deadline.
    Completed,
    /// The deadline passed first.
    TimedOut,
}

/// Lifecycle of a run, published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Created,
    Running,
    Completed,
    TimedOut,
    Finalizing,
    Done,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub source: String,
    pub outcome: RunOutcome,
    pub total: usize,
    pub finished: usize,
    pub failed: usize,
    pub uploaded_batches: usize,
    pub elapsed_ms: u64,
}

/// Human-readable status lines posted through the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Processing,
    Progress { done: usize, total: usize },
    Completed { source: String, uploaded: usize },
    TimedOut,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "Processing..."),
            Self::Progress { done, total } => write!(f, "Downloading... {}/{}", done, total),
            Self::Completed { source, uploaded } => write!(
                f,
                "Upload complete!\nSet: {}\nArchives: {}",
                source, uploaded
            ),
            Self::TimedOut => write!(f, "Timed out before the set finished processing"),
        }
    }
}
