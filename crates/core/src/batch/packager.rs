//! Packaging and delivery of batches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::archive::compress_dir;
use super::files::move_file;
use super::types::Batch;
use crate::metrics::{events, MetricsSink};
use crate::run::{RunStatus, RunTask};
use crate::transport::{Transport, TransportError};

/// Errors raised while packaging a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to create batch folder {path}: {error}")]
    FolderCreation {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Archive failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Archive task failed: {0}")]
    ArchiveTask(String),

    #[error("Delivery failed: {0}")]
    Transport(#[from] TransportError),
}

/// What a successful packaging attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedBatch {
    pub index: u64,
    pub files: usize,
    pub content_bytes: u64,
    pub archive_bytes: u64,
}

/// Turns pending batches into archives and hands them to the transport.
pub struct BatchPackager {
    transport: Arc<dyn Transport>,
    metrics: Arc<dyn MetricsSink>,
}

impl BatchPackager {
    pub fn new(transport: Arc<dyn Transport>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { transport, metrics }
    }

    /// Takes the run's pending batch, archives it and sends it.
    ///
    /// Returns `true` only when an archive was delivered. Batch folder and
    /// archive are removed whatever the outcome.
    pub async fn flush(&self, task: &RunTask) -> bool {
        let batch = task.accumulator().take_and_reset();
        if batch.is_empty() {
            // Another flush already took these files; the index still
            // belongs to the open batch.
            return false;
        }
        let index = batch.index;
        let batch_dir = task.batch_folder(index);
        let archive = task.archive_path(index);

        let outcome = self.package(task, batch, &batch_dir, &archive).await;

        if let Err(e) = tokio::fs::remove_dir_all(&batch_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %batch_dir.display(), error = %e, "Failed to remove batch folder");
            }
        }
        if let Err(e) = tokio::fs::remove_file(&archive).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %archive.display(), error = %e, "Failed to remove archive");
            }
        }

        match outcome {
            Ok(Some(packaged)) => {
                task.record_uploaded();
                self.metrics.increment(events::BATCH_UPLOADED, 1);
                self.metrics
                    .observe(events::BATCH_SIZE_BYTES, packaged.archive_bytes as f64);
                info!(
                    run_id = %task.run_id(),
                    batch = packaged.index,
                    files = packaged.files,
                    content_bytes = packaged.content_bytes,
                    archive_bytes = packaged.archive_bytes,
                    "Batch uploaded"
                );

                let status = task.progress_status().to_string();
                if let Err(e) = self.transport.update_status(&status).await {
                    debug!(error = %e, "Failed to update status after upload");
                }
                true
            }
            Ok(None) => {
                debug!(run_id = %task.run_id(), batch = index, "No files to upload, skipping batch");
                false
            }
            Err(e) => {
                self.metrics.increment(events::BATCH_FAILED, 1);
                error!(run_id = %task.run_id(), batch = index, error = %e, "Batch upload failed");
                false
            }
        }
    }

    async fn package(
        &self,
        task: &RunTask,
        batch: Batch,
        batch_dir: &Path,
        archive: &Path,
    ) -> Result<Option<PackagedBatch>, BatchError> {
        tokio::fs::create_dir_all(batch_dir)
            .await
            .map_err(|error| BatchError::FolderCreation {
                path: batch_dir.to_path_buf(),
                error,
            })?;

        let mut files = 0;
        let mut content_bytes = 0;
        for artifact in &batch.artifacts {
            let size = match tokio::fs::metadata(artifact).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(path = %artifact.display(), error = %e, "Artifact vanished before packaging");
                    continue;
                }
            };
            let Some(name) = artifact.file_name() else {
                continue;
            };
            if let Err(e) = move_file(artifact, &batch_dir.join(name)).await {
                warn!(path = %artifact.display(), error = %e, "Failed to move artifact into batch");
                continue;
            }
            files += 1;
            content_bytes += size;
        }

        if content_bytes == 0 {
            return Ok(None);
        }

        let (src, dst) = (batch_dir.to_path_buf(), archive.to_path_buf());
        let archive_bytes = tokio::task::spawn_blocking(move || compress_dir(&src, &dst))
            .await
            .map_err(|e| BatchError::ArchiveTask(e.to_string()))??;

        debug!(
            run_id = %task.run_id(),
            batch = batch.index,
            archive = %archive.display(),
            archive_bytes,
            "Sending archive"
        );
        self.transport.send_archive(archive).await?;

        Ok(Some(PackagedBatch {
            index: batch.index,
            files,
            content_bytes,
            archive_bytes,
        }))
    }
}
