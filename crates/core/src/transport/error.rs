//! Error types for the transport module.

use thiserror::Error;

/// Errors that can occur while talking to a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The requested collection does not exist.
    #[error("Source not found: {name}")]
    SourceNotFound { name: String },

    /// The collection name contains characters the transport refuses.
    #[error("Invalid source name: {name}")]
    InvalidSource { name: String },

    /// Listing the collection failed.
    #[error("Listing failed: {reason}")]
    ListFailed { reason: String },

    /// Fetching raw bytes for an item failed.
    #[error("Fetch failed for {fetch_ref}: {reason}")]
    FetchFailed { fetch_ref: String, reason: String },

    /// Archive exceeds what the transport can deliver.
    #[error("Archive too large: {size_bytes} bytes exceeds limit of {limit_bytes} bytes")]
    ArchiveTooLarge { size_bytes: u64, limit_bytes: u64 },

    /// Delivering an archive failed.
    #[error("Send failed: {reason}")]
    SendFailed { reason: String },

    /// Updating the status line failed.
    #[error("Status update failed: {reason}")]
    StatusFailed { reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn fetch_failed(fetch_ref: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            fetch_ref: fetch_ref.into(),
            reason: reason.into(),
        }
    }

    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed {
            reason: reason.into(),
        }
    }
}
