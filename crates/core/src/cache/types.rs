//! Types for the content cache.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Database(e.to_string())
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cached artifacts.
    pub entries: u64,
    /// Total size of cached artifacts in bytes.
    pub total_bytes: u64,
    /// Sum of hits across all entries.
    pub total_hits: u64,
    /// Oldest entry (RFC 3339).
    pub oldest_entry: Option<String>,
    /// Newest entry (RFC 3339).
    pub newest_entry: Option<String>,
}
