//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::transport::SourceFormat;

/// Format of a converted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Gif,
}

impl OutputFormat {
    /// Static images stay static; everything else becomes an animated GIF.
    pub fn for_source(format: &SourceFormat) -> Self {
        match format {
            SourceFormat::Webp => Self::Png,
            _ => Self::Gif,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }
}

/// A single conversion request.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Identifier used in logs.
    pub job_id: String,
    /// Raw downloaded file.
    pub input_path: PathBuf,
    /// Declared format of the input.
    pub input_format: SourceFormat,
    /// Where the artifact must be written.
    pub output_path: PathBuf,
    /// Where to keep a copy of the decoded intermediate, if anywhere.
    pub preserve_intermediate: Option<PathBuf>,
}

impl ConversionJob {
    pub fn new(
        job_id: impl Into<String>,
        input_path: impl Into<PathBuf>,
        input_format: SourceFormat,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            input_path: input_path.into(),
            input_format,
            output_path: output_path.into(),
            preserve_intermediate: None,
        }
    }

    pub fn with_preserve_intermediate(mut self, path: impl Into<PathBuf>) -> Self {
        self.preserve_intermediate = Some(path.into());
        self
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub job_id: String,
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub duration_ms: u64,
    /// Set when the decoded intermediate was kept.
    pub intermediate_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_for_source() {
        assert_eq!(OutputFormat::for_source(&SourceFormat::Webp), OutputFormat::Png);
        assert_eq!(OutputFormat::for_source(&SourceFormat::Webm), OutputFormat::Gif);
        assert_eq!(OutputFormat::for_source(&SourceFormat::Tgs), OutputFormat::Gif);
        assert_eq!(
            OutputFormat::for_source(&SourceFormat::Other("bmp".into())),
            OutputFormat::Gif
        );
    }

    #[test]
    fn test_output_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("a/b.PNG")), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(Path::new("a/b.gif")), Some(OutputFormat::Gif));
        assert_eq!(OutputFormat::from_path(Path::new("a/b.json")), None);
        assert_eq!(OutputFormat::from_path(Path::new("a/b")), None);
    }

    #[test]
    fn test_job_builder() {
        let job = ConversionJob::new("j", "/in.tgs", SourceFormat::Tgs, "/out.gif")
            .with_preserve_intermediate("/keep.json");
        assert_eq!(job.preserve_intermediate, Some(PathBuf::from("/keep.json")));
    }
}
