//! Types shared by every transport implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Declared format of a source item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Static WebP image.
    Webp,
    /// Animated WebM (VP9) video.
    Webm,
    /// Gzip-compressed Lottie animation.
    Tgs,
    /// MP4 video.
    Mp4,
    /// Anything else, keyed by its lowercase extension.
    Other(String),
}

impl SourceFormat {
    /// Parse a file extension (with or without the leading dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "webp" => Self::Webp,
            "webm" => Self::Webm,
            "tgs" => Self::Tgs,
            "mp4" => Self::Mp4,
            other => Self::Other(other.to_string()),
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or_else(|| Self::Other(String::new()))
    }

    /// File extension for this format, without the dot.
    pub fn extension(&self) -> &str {
        match self {
            Self::Webp => "webp",
            Self::Webm => "webm",
            Self::Tgs => "tgs",
            Self::Mp4 => "mp4",
            Self::Other(ext) => ext,
        }
    }

    /// Whether this is a compressed vector animation that needs the
    /// dedicated renderer instead of ffmpeg.
    pub fn is_compressed_vector(&self) -> bool {
        matches!(self, Self::Tgs)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One unit of source work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Stable identifier, also the content cache key.
    pub content_id: String,
    /// Opaque reference the transport uses to fetch the raw bytes.
    pub fetch_ref: String,
    /// Declared source format.
    pub format: SourceFormat,
}

impl WorkItem {
    pub fn new(
        content_id: impl Into<String>,
        fetch_ref: impl Into<String>,
        format: SourceFormat,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            fetch_ref: fetch_ref.into(),
            format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension_is_case_insensitive() {
        assert_eq!(SourceFormat::from_extension("WEBP"), SourceFormat::Webp);
        assert_eq!(SourceFormat::from_extension(".tgs"), SourceFormat::Tgs);
        assert_eq!(
            SourceFormat::from_extension("gif"),
            SourceFormat::Other("gif".to_string())
        );
    }

    #[test]
    fn test_from_path_without_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("/tmp/sticker")),
            SourceFormat::Other(String::new())
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("/tmp/a.webm")),
            SourceFormat::Webm
        );
    }

    #[test]
    fn test_only_tgs_is_compressed_vector() {
        assert!(SourceFormat::Tgs.is_compressed_vector());
        assert!(!SourceFormat::Webm.is_compressed_vector());
        assert!(!SourceFormat::Other("tgs2".into()).is_compressed_vector());
    }

    #[test]
    fn test_format_serialization() {
        let json = serde_json::to_string(&SourceFormat::Webm).unwrap();
        assert_eq!(json, "\"webm\"");
        let parsed: SourceFormat = serde_json::from_str("\"tgs\"").unwrap();
        assert_eq!(parsed, SourceFormat::Tgs);
    }
}
