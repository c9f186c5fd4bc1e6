//! Error types for runs.

use std::path::PathBuf;
use thiserror::Error;

use crate::converter::ConverterError;
use crate::transport::TransportError;

/// Errors that stop a run before any work starts.
///
/// A run that hits its deadline is not an error; it reports
/// [`RunOutcome::TimedOut`](super::RunOutcome::TimedOut).
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to list items of {name}: {error}")]
    Listing {
        name: String,
        #[source]
        error: TransportError,
    },

    #[error("Run id {run_id:?} is not a plain name")]
    InvalidRunId { run_id: String },

    #[error("Collection has {count} items, more than the limit of {limit}")]
    TooManyItems { count: usize, limit: usize },

    #[error("Failed to create run folder {path}: {error}")]
    TempFolder {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

/// Why a single item failed.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] TransportError),

    #[error("conversion failed: {0}")]
    Convert(#[from] ConverterError),

    #[error("failed to copy cached artifact {path}: {error}")]
    CachedCopy {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}
