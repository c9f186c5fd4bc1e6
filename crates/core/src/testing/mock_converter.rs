//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::converter::{ConversionJob, ConversionResult, Converter, ConverterError};
use crate::transport::SourceFormat;

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Writes a sparse output file of the configured size instead of running
/// any tool, so large batches cost no disk space.
///
/// # Example
///
/// ```rust,ignore
/// use packforge_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.set_output_size(6 * 1024).await;
/// converter.fail_format(SourceFormat::Tgs).await;
/// converter.set_conversion_duration(500).await; // honours cancellation
///
/// let conversions = converter.recorded_conversions().await;
/// ```
#[derive(Debug, Clone)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// Size of every output file.
    output_size: Arc<RwLock<u64>>,
    /// Per-content-id output sizes, keyed by a substring of the output file name.
    sizes_by_name: Arc<RwLock<HashMap<String, u64>>>,
    /// Formats whose conversions fail.
    failing_formats: Arc<RwLock<HashSet<SourceFormat>>>,
    /// If set, the next conversion will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated conversion duration in milliseconds.
    conversion_duration_ms: Arc<RwLock<u64>>,
    /// Conversions stopped by their cancellation token.
    cancelled: Arc<AtomicUsize>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter producing 1 KiB artifacts.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            output_size: Arc::new(RwLock::new(1024)),
            sizes_by_name: Arc::new(RwLock::new(HashMap::new())),
            failing_formats: Arc::new(RwLock::new(HashSet::new())),
            next_error: Arc::new(RwLock::new(None)),
            conversion_duration_ms: Arc::new(RwLock::new(0)),
            cancelled: Arc::new(AtomicUsize::new(0)),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub async fn set_output_size(&self, bytes: u64) {
        *self.output_size.write().await = bytes;
    }

    /// Output size for artifacts whose file name contains `content_id`.
    pub async fn set_output_size_for(&self, content_id: &str, bytes: u64) {
        self.sizes_by_name
            .write()
            .await
            .insert(content_id.to_string(), bytes);
    }

    pub async fn fail_format(&self, format: SourceFormat) {
        self.failing_formats.write().await.insert(format);
    }

    /// Set an error to be returned by the next conversion.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration_ms: u64) {
        *self.conversion_duration_ms.write().await = duration_ms;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn output_size_for(&self, job: &ConversionJob) -> u64 {
        let name = job
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sizes = self.sizes_by_name.read().await;
        sizes
            .iter()
            .find(|(key, _)| name.contains(key.as_str()))
            .map(|(_, size)| *size)
            .unwrap_or(*self.output_size.read().await)
    }

    async fn attempt(
        &self,
        job: &ConversionJob,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        let duration = *self.conversion_duration_ms.read().await;
        if duration > 0 {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.cancelled.fetch_add(1, Ordering::SeqCst);
                    return Err(ConverterError::Cancelled);
                }
                _ = tokio::time::sleep(Duration::from_millis(duration)) => {}
            }
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        if self.failing_formats.read().await.contains(&job.input_format) {
            return Err(ConverterError::conversion_failed(
                format!("mock failure for {}", job.input_format),
                None,
            ));
        }
        if !tokio::fs::try_exists(&job.input_path).await.unwrap_or(false) {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let size = self.output_size_for(job).await;
        let file = tokio::fs::File::create(&job.output_path).await?;
        file.set_len(size).await?;

        let intermediate_path = match &job.preserve_intermediate {
            Some(path) => {
                tokio::fs::write(path, b"{}").await?;
                Some(path.clone())
            }
            None => None,
        };

        Ok(ConversionResult {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: size,
            duration_ms: start.elapsed().as_millis() as u64,
            intermediate_path,
        })
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        let result = self.attempt(&job, &cancel).await;
        self.conversions.write().await.push(RecordedConversion {
            job,
            success: result.is_ok(),
        });
        result
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        Ok(())
    }
}
