//! Run supervisor: owns one run from listing to cleanup.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::config::RunConfig;
use super::error::RunError;
use super::progress::ProgressReporter;
use super::task::RunTask;
use super::types::{RunOutcome, RunState, RunStatus, RunSummary};
use super::worker::{Worker, WorkerSettings};
use crate::batch::{purge_dir, BatchPackager};
use crate::cache::ContentCache;
use crate::converter::Converter;
use crate::metrics::{events, MetricsSink};
use crate::transport::{validate_source_name, Transport, WorkItem};

/// One request to process a collection.
pub struct RunRequest {
    pub run_id: String,
    pub source: String,
    pub transport: Arc<dyn Transport>,
    state_tx: Option<watch::Sender<RunState>>,
}

impl RunRequest {
    pub fn new(source: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            source: source.into(),
            transport,
            state_tx: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Publishes every state transition of the run on `tx`.
    pub fn with_state_channel(mut self, tx: watch::Sender<RunState>) -> Self {
        self.state_tx = Some(tx);
        self
    }
}

struct StateObserver(Option<watch::Sender<RunState>>);

impl StateObserver {
    fn set(&self, state: RunState) {
        if let Some(tx) = &self.0 {
            tx.send_replace(state);
        }
    }
}

/// Runs collections through workers, batching and delivery.
pub struct RunSupervisor {
    config: RunConfig,
    converter: Arc<dyn Converter>,
    cache: Arc<dyn ContentCache>,
    metrics: Arc<dyn MetricsSink>,
}

impl RunSupervisor {
    pub fn new(
        config: RunConfig,
        converter: Arc<dyn Converter>,
        cache: Arc<dyn ContentCache>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            converter,
            cache,
            metrics,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Processes one collection end to end.
    ///
    /// Hitting the deadline is reported as [`RunOutcome::TimedOut`], not as an
    /// error. The run folder is removed whatever happens after it was created.
    pub async fn run(&self, request: RunRequest) -> Result<RunSummary, RunError> {
        let RunRequest {
            run_id,
            source,
            transport,
            state_tx,
        } = request;
        let observer = StateObserver(state_tx);
        observer.set(RunState::Created);

        let result = self.run_inner(&run_id, &source, transport, &observer).await;
        observer.set(RunState::Done);
        result
    }

    async fn run_inner(
        &self,
        run_id: &str,
        source: &str,
        transport: Arc<dyn Transport>,
        observer: &StateObserver,
    ) -> Result<RunSummary, RunError> {
        // The id names the run folder under temp_dir.
        if validate_source_name(run_id).is_err() {
            return Err(RunError::InvalidRunId {
                run_id: run_id.to_string(),
            });
        }

        let items = transport
            .list_items(source)
            .await
            .map_err(|error| RunError::Listing {
                name: source.to_string(),
                error,
            })?;

        if items.len() > self.config.max_items_per_run {
            return Err(RunError::TooManyItems {
                count: items.len(),
                limit: self.config.max_items_per_run,
            });
        }

        if let Err(e) = transport
            .update_status(&RunStatus::Processing.to_string())
            .await
        {
            warn!(run_id, error = %e, "Failed to post initial status");
        }

        let folder = self.config.temp_dir.join(format!("run-{}", run_id));
        let created = match tokio::fs::create_dir_all(&self.config.temp_dir).await {
            Ok(()) => tokio::fs::create_dir(&folder).await,
            Err(e) => Err(e),
        };
        if let Err(error) = created {
            return Err(RunError::TempFolder {
                path: folder,
                error,
            });
        }

        info!(run_id, source, items = items.len(), folder = %folder.display(), "Run started");
        let task = Arc::new(RunTask::new(
            run_id,
            items.len(),
            &folder,
            self.config.max_batch_size_bytes,
        ));

        let summary = self.execute(&task, source, items, transport, observer).await;

        if let Err(e) = purge_dir(&folder).await {
            error!(run_id, folder = %folder.display(), error = %e, "Failed to remove run folder");
        }
        Ok(summary)
    }

    async fn execute(
        &self,
        task: &Arc<RunTask>,
        source: &str,
        items: Vec<WorkItem>,
        transport: Arc<dyn Transport>,
        observer: &StateObserver,
    ) -> RunSummary {
        let cancel = CancellationToken::new();
        let packager = Arc::new(BatchPackager::new(
            Arc::clone(&transport),
            Arc::clone(&self.metrics),
        ));

        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));
        let settings = WorkerSettings {
            cache_writes: self.config.cache_writes,
            preserve_intermediate: self.config.preserve_intermediate,
        };

        let workers: Vec<_> = (0..self.config.worker_count.max(1))
            .map(|id| {
                let worker = Worker {
                    id,
                    task: Arc::clone(task),
                    queue: Arc::clone(&queue),
                    transport: Arc::clone(&transport),
                    converter: Arc::clone(&self.converter),
                    cache: Arc::clone(&self.cache),
                    metrics: Arc::clone(&self.metrics),
                    packager: Arc::clone(&packager),
                    cancel: cancel.clone(),
                    settings,
                };
                tokio::spawn(worker.run())
            })
            .collect();
        let feeder = tokio::spawn(feed(items, tx, cancel.clone()));
        let reporter = tokio::spawn(
            ProgressReporter::new(
                Arc::clone(task),
                Arc::clone(&transport),
                self.config.tick_interval(),
            )
            .run(cancel.clone()),
        );
        observer.set(RunState::Running);

        let outcome = self.wait_for_outcome(task).await;
        observer.set(match outcome {
            RunOutcome::Completed => RunState::Completed,
            RunOutcome::TimedOut => RunState::TimedOut,
        });

        cancel.cancel();
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!(run_id = %task.run_id(), error = %e, "Worker task failed");
            }
        }
        if let Err(e) = feeder.await {
            error!(run_id = %task.run_id(), error = %e, "Feeder task failed");
        }
        if let Err(e) = reporter.await {
            error!(run_id = %task.run_id(), error = %e, "Progress task failed");
        }

        observer.set(RunState::Finalizing);
        let status = match outcome {
            RunOutcome::Completed => {
                packager.flush(task).await;
                self.metrics.increment(events::RUN_COMPLETED, 1);
                RunStatus::Completed {
                    source: source.to_string(),
                    uploaded: task.uploaded(),
                }
            }
            RunOutcome::TimedOut => {
                self.metrics.increment(events::RUN_TIMED_OUT, 1);
                RunStatus::TimedOut
            }
        };
        if let Err(e) = transport.update_status(&status.to_string()).await {
            warn!(run_id = %task.run_id(), error = %e, "Failed to post final status");
        }

        let elapsed = task.elapsed();
        self.metrics
            .observe(events::RUN_DURATION_SECONDS, elapsed.as_secs_f64());

        let summary = RunSummary {
            run_id: task.run_id().to_string(),
            source: source.to_string(),
            outcome,
            total: task.total(),
            finished: task.finished(),
            failed: task.failed(),
            uploaded_batches: task.uploaded(),
            elapsed_ms: elapsed.as_millis() as u64,
        };
        info!(
            run_id = %summary.run_id,
            outcome = ?summary.outcome,
            finished = summary.finished,
            failed = summary.failed,
            uploaded = summary.uploaded_batches,
            elapsed_ms = summary.elapsed_ms,
            "Run finished"
        );
        summary
    }

    /// Ticks until every item is accounted for or the deadline passes.
    async fn wait_for_outcome(&self, task: &RunTask) -> RunOutcome {
        let deadline = self.config.deadline();
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if task.elapsed() > deadline {
                warn!(
                    run_id = %task.run_id(),
                    done = task.done(),
                    total = task.total(),
                    "Run deadline exceeded"
                );
                return RunOutcome::TimedOut;
            }
            if task.is_complete() {
                return RunOutcome::Completed;
            }
        }
    }
}

/// Pushes items into the queue until all are sent or the run is cancelled.
async fn feed(items: Vec<WorkItem>, tx: mpsc::Sender<WorkItem>, cancel: CancellationToken) {
    for item in items {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            sent = tx.send(item) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}
