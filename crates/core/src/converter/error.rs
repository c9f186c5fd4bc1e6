//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// An external tool binary could not be found.
    #[error("{tool} not found at path: {path}")]
    ToolNotFound { tool: String, path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Compressed vector animations are switched off.
    #[error("TGS conversion is disabled")]
    TgsDisabled,

    /// The compressed vector payload could not be decoded.
    #[error("Failed to decode TGS payload: {reason}")]
    TgsDecode { reason: String },

    /// Conversion process failed.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Post-processing of the converted image failed.
    #[error("Image processing failed: {reason}")]
    ImageFailed { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Job was cancelled.
    #[error("Conversion cancelled")]
    Cancelled,
}

impl ConverterError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn tgs_decode(reason: impl Into<String>) -> Self {
        Self::TgsDecode {
            reason: reason.into(),
        }
    }

    pub fn image_failed(reason: impl Into<String>) -> Self {
        Self::ImageFailed {
            reason: reason.into(),
        }
    }

    /// Whether a later attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ConverterError::ToolNotFound {
            tool: "ffmpeg".to_string(),
            path: PathBuf::from("/usr/bin/ffmpeg"),
        };
        assert_eq!(err.to_string(), "ffmpeg not found at path: /usr/bin/ffmpeg");

        let err = ConverterError::conversion_failed("exit 1", Some("boom".into()));
        assert_eq!(err.to_string(), "Conversion failed: exit 1");
    }

    #[test]
    fn test_retryable() {
        assert!(ConverterError::Timeout { timeout_secs: 5 }.is_retryable());
        assert!(!ConverterError::TgsDisabled.is_retryable());
        assert!(!ConverterError::Cancelled.is_retryable());
    }
}
