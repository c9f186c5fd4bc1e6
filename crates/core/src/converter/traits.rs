//! Trait definitions for the converter module.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionResult};
use crate::transport::SourceFormat;

/// A converter that turns raw stickers into shareable artifacts.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts the job's input into its output path.
    ///
    /// Any external process is terminated once `cancel` fires, and the
    /// call then returns [`ConverterError::Cancelled`].
    async fn convert(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;

    /// Whether inputs of this format are currently accepted.
    fn supports(&self, format: &SourceFormat) -> bool {
        self.supported_input_formats()
            .contains(&format.extension())
    }

    /// Returns the supported input formats.
    fn supported_input_formats(&self) -> &[&str] {
        &["webp", "webm", "tgs", "mp4"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct CopyConverter;

    #[async_trait]
    impl Converter for CopyConverter {
        fn name(&self) -> &str {
            "copy"
        }

        async fn convert(
            &self,
            job: ConversionJob,
            cancel: CancellationToken,
        ) -> Result<ConversionResult, ConverterError> {
            if cancel.is_cancelled() {
                return Err(ConverterError::Cancelled);
            }
            Ok(ConversionResult {
                job_id: job.job_id,
                output_path: job.output_path,
                output_size_bytes: 0,
                duration_ms: 0,
                intermediate_path: None,
            })
        }

        async fn validate(&self) -> Result<(), ConverterError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_converter_trait_object() {
        let converter: Box<dyn Converter> = Box::new(CopyConverter);
        assert_eq!(converter.name(), "copy");
        assert!(converter.validate().await.is_ok());

        let job = ConversionJob::new("j1", "/in.webp", SourceFormat::Webp, "/out.png");
        let result = converter.convert(job, CancellationToken::new()).await.unwrap();
        assert_eq!(result.output_path, PathBuf::from("/out.png"));
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let converter = CopyConverter;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let job = ConversionJob::new("j1", "/in.webp", SourceFormat::Webp, "/out.png");
        let err = converter.convert(job, cancel).await.unwrap_err();
        assert!(matches!(err, ConverterError::Cancelled));
    }

    #[test]
    fn test_default_supports() {
        let converter = CopyConverter;
        assert!(converter.supports(&SourceFormat::Tgs));
        assert!(converter.supports(&SourceFormat::Webm));
        assert!(!converter.supports(&SourceFormat::Other("bmp".into())));
    }
}
