//! Periodic progress line.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::task::RunTask;
use crate::transport::Transport;

/// Posts `done/total` through the transport whenever it changes.
pub(crate) struct ProgressReporter {
    task: Arc<RunTask>,
    transport: Arc<dyn Transport>,
    interval: Duration,
}

impl ProgressReporter {
    pub(crate) fn new(task: Arc<RunTask>, transport: Arc<dyn Transport>, interval: Duration) -> Self {
        Self {
            task,
            transport,
            interval,
        }
    }

    pub(crate) async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately; the first report waits a full period.
        ticker.tick().await;

        let mut last_text = String::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let text = self.task.progress_status().to_string();
                    if text == last_text {
                        continue;
                    }
                    if let Err(e) = self.transport.update_status(&text).await {
                        debug!(run_id = %self.task.run_id(), error = %e, "Progress update failed");
                    }
                    last_text = text;
                }
            }
        }
    }
}
