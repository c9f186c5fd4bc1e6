//! Shared state of one run.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::types::RunStatus;
use crate::batch::BatchAccumulator;

/// Counters, folder and accumulator shared by the workers of a run.
#[derive(Debug)]
pub struct RunTask {
    run_id: String,
    total: usize,
    finished: AtomicUsize,
    failed: AtomicUsize,
    uploaded: AtomicUsize,
    folder: PathBuf,
    accumulator: BatchAccumulator,
    started_at: Instant,
}

impl RunTask {
    pub fn new(
        run_id: impl Into<String>,
        total: usize,
        folder: impl Into<PathBuf>,
        max_batch_bytes: u64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            total,
            finished: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            uploaded: AtomicUsize::new(0),
            folder: folder.into(),
            accumulator: BatchAccumulator::new(max_batch_bytes),
            started_at: Instant::now(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn uploaded(&self) -> usize {
        self.uploaded.load(Ordering::SeqCst)
    }

    /// Items that reached a final state, successful or not.
    pub fn done(&self) -> usize {
        self.finished() + self.failed()
    }

    pub fn is_complete(&self) -> bool {
        self.done() >= self.total
    }

    pub(crate) fn record_finished(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_uploaded(&self) {
        self.uploaded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn accumulator(&self) -> &BatchAccumulator {
        &self.accumulator
    }

    /// Name shared by the run's archives: the run folder's name.
    pub fn archive_stem(&self) -> String {
        self.folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.run_id.clone())
    }

    /// `<run>/batch-<index>/`
    pub fn batch_folder(&self, index: u64) -> PathBuf {
        self.folder.join(format!("batch-{}", index))
    }

    /// `<run>/<run-name>_part-<index>.zip`
    pub fn archive_path(&self, index: u64) -> PathBuf {
        self.folder
            .join(format!("{}_part-{}.zip", self.archive_stem(), index))
    }

    pub fn progress_status(&self) -> RunStatus {
        RunStatus::Progress {
            done: self.done(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let task = RunTask::new("r1", 3, "/tmp/run-r1", 100);
        assert!(!task.is_complete());

        task.record_finished();
        task.record_failed();
        assert_eq!(task.done(), 2);
        assert_eq!(
            task.progress_status(),
            RunStatus::Progress { done: 2, total: 3 }
        );

        task.record_finished();
        assert!(task.is_complete());
        assert_eq!(task.finished(), 2);
        assert_eq!(task.failed(), 1);
    }

    #[test]
    fn test_empty_run_is_complete() {
        assert!(RunTask::new("r", 0, "/tmp/run-r", 1).is_complete());
    }

    #[test]
    fn test_paths() {
        let task = RunTask::new("abc", 1, "/tmp/run-abc", 100);
        assert_eq!(task.batch_folder(2), PathBuf::from("/tmp/run-abc/batch-2"));
        assert_eq!(
            task.archive_path(3),
            PathBuf::from("/tmp/run-abc/run-abc_part-3.zip")
        );
    }
}
