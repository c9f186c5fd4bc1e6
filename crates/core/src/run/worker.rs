//! Worker loop: fetch or reuse, convert, cache, register for batching.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::error::ItemError;
use super::task::RunTask;
use crate::batch::{BatchPackager, RegisterOutcome};
use crate::cache::ContentCache;
use crate::converter::{ConversionJob, Converter, ConverterError, OutputFormat};
use crate::metrics::{events, MetricsSink};
use crate::transport::{Transport, WorkItem};

/// Work queue shared by every worker of a run.
pub(crate) type SharedQueue = Arc<Mutex<mpsc::Receiver<WorkItem>>>;

/// Per-run switches a worker consults.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerSettings {
    pub cache_writes: bool,
    pub preserve_intermediate: bool,
}

pub(crate) struct Worker {
    pub id: usize,
    pub task: Arc<RunTask>,
    pub queue: SharedQueue,
    pub transport: Arc<dyn Transport>,
    pub converter: Arc<dyn Converter>,
    pub cache: Arc<dyn ContentCache>,
    pub metrics: Arc<dyn MetricsSink>,
    pub packager: Arc<BatchPackager>,
    pub cancel: CancellationToken,
    pub settings: WorkerSettings,
}

async fn next_item(queue: &SharedQueue) -> Option<WorkItem> {
    queue.lock().await.recv().await
}

fn is_cancellation<T>(result: &Result<T, ItemError>) -> bool {
    matches!(result, Err(ItemError::Convert(ConverterError::Cancelled)))
}

impl Worker {
    /// Processes items until the queue closes or the run is cancelled.
    ///
    /// Cancellation stops a running conversion; the item it belonged to is
    /// cleaned up and left uncounted. Registration and any flush it
    /// triggers always run to completion.
    pub(crate) async fn run(self) {
        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                item = next_item(&self.queue) => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            // The converter observes the token itself, so the stage runs to
            // completion and its raw download is always removed.
            let prepared = self.prepare(&item).await;
            if self.cancel.is_cancelled() || is_cancellation(&prepared) {
                debug!(worker = self.id, content_id = %item.content_id, "Abandoning item on cancellation");
                break;
            }

            match prepared {
                Ok(artifacts) => {
                    for artifact in &artifacts {
                        self.register(artifact).await;
                    }
                    self.task.record_finished();
                    self.metrics.increment(events::ITEM_FINISHED, 1);
                }
                Err(e) => {
                    error!(
                        worker = self.id,
                        position = %format!("[{}/{}]", self.task.done() + 1, self.task.total()),
                        run_id = %self.task.run_id(),
                        content_id = %item.content_id,
                        error = %e,
                        "Item failed"
                    );
                    self.task.record_failed();
                    self.metrics.increment(events::ITEM_FAILED, 1);
                }
            }
        }
        debug!(worker = self.id, "Worker stopped");
    }

    /// Produces the item's files inside the run folder, artifact first.
    async fn prepare(&self, item: &WorkItem) -> Result<Vec<PathBuf>, ItemError> {
        match self.lookup_cached(item).await {
            Some(cached) => Ok(vec![self.reuse_cached(item, &cached).await?]),
            None => self.fetch_and_convert(item).await,
        }
    }

    async fn lookup_cached(&self, item: &WorkItem) -> Option<PathBuf> {
        match self.cache.lookup(&item.content_id).await {
            Ok(Some(path)) => {
                self.metrics.increment(events::CACHE_HIT, 1);
                Some(path)
            }
            Ok(None) => {
                self.metrics.increment(events::CACHE_MISS, 1);
                None
            }
            Err(e) => {
                warn!(content_id = %item.content_id, error = %e, "Cache lookup failed, treating as miss");
                self.metrics.increment(events::CACHE_MISS, 1);
                None
            }
        }
    }

    async fn reuse_cached(&self, item: &WorkItem, cached: &Path) -> Result<PathBuf, ItemError> {
        let ext = cached
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_else(|| OutputFormat::for_source(&item.format).extension());
        let output = self
            .task
            .folder()
            .join(format!("{}.{}", item.content_id, ext));

        let copied = tokio::fs::copy(cached, &output).await;
        if let Err(e) = tokio::fs::remove_file(cached).await {
            debug!(path = %cached.display(), error = %e, "Failed to remove cache copy");
        }
        copied.map_err(|error| ItemError::CachedCopy {
            path: cached.to_path_buf(),
            error,
        })?;

        debug!(content_id = %item.content_id, "Reused cached artifact");
        Ok(output)
    }

    async fn fetch_and_convert(&self, item: &WorkItem) -> Result<Vec<PathBuf>, ItemError> {
        let raw = self.transport.fetch_raw(item).await?;

        let format = OutputFormat::for_source(&item.format);
        let output = self
            .task
            .folder()
            .join(format!("{}.{}", item.content_id, format.extension()));
        let mut job = ConversionJob::new(
            format!("{}-{}", self.task.run_id(), item.content_id),
            &raw,
            item.format.clone(),
            &output,
        );
        if self.settings.preserve_intermediate
            && item.format.is_compressed_vector()
            && self.converter.supports(&item.format)
        {
            job = job.with_preserve_intermediate(
                self.task.folder().join(format!("{}.json", item.content_id)),
            );
        }

        let converted = self.converter.convert(job, self.cancel.clone()).await;
        if let Err(e) = tokio::fs::remove_file(&raw).await {
            debug!(path = %raw.display(), error = %e, "Failed to remove raw download");
        }
        let result = converted?;

        if self.settings.cache_writes {
            if let Err(e) = self.cache.store(&item.content_id, &result.output_path).await {
                warn!(content_id = %item.content_id, error = %e, "Failed to store artifact in cache");
            }
        }

        Ok(std::iter::once(result.output_path)
            .chain(result.intermediate_path)
            .collect())
    }

    /// Offers the artifact to the accumulator, flushing as often as needed.
    async fn register(&self, artifact: &Path) {
        let size = match tokio::fs::metadata(artifact).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %artifact.display(), error = %e, "Cannot stat artifact, leaving it out of batches");
                return;
            }
        };

        while self
            .task
            .accumulator()
            .register(artifact.to_path_buf(), size)
            == RegisterOutcome::MustFlush
        {
            self.packager.flush(&self.task).await;
        }
    }
}
