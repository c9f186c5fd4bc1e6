use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, OwnedSemaphorePermit, RwLock, Semaphore};

use packforge_core::{
    CacheError, CacheStats, Config, DirectoryTransport, RunError, RunState, RunSummary,
    RunSupervisor, SqliteContentCache, StatusBoard,
};

/// Book-keeping for one run started through the API.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub state: watch::Receiver<RunState>,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

impl RunRecord {
    pub fn new(id: &str, source: &str, state: watch::Receiver<RunState>) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            created_at: Utc::now(),
            state,
            summary: None,
            error: None,
        }
    }

    pub fn current_state(&self) -> RunState {
        *self.state.borrow()
    }

    /// True once the run's outcome has been recorded.
    pub fn is_finished(&self) -> bool {
        self.summary.is_some() || self.error.is_some()
    }
}

/// Shared application state
pub struct AppState {
    config: Config,
    supervisor: Arc<RunSupervisor>,
    transport: DirectoryTransport,
    cache: Option<Arc<SqliteContentCache>>,
    runs: RwLock<HashMap<String, RunRecord>>,
    run_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        config: Config,
        supervisor: Arc<RunSupervisor>,
        transport: DirectoryTransport,
        cache: Option<Arc<SqliteContentCache>>,
    ) -> Self {
        let run_slots = Arc::new(Semaphore::new(config.server.max_concurrent_runs));
        Self {
            config,
            supervisor,
            transport,
            cache,
            runs: RwLock::new(HashMap::new()),
            run_slots,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn supervisor(&self) -> Arc<RunSupervisor> {
        Arc::clone(&self.supervisor)
    }

    /// Base transport; bind it to a run with `for_source`.
    pub fn transport(&self) -> &DirectoryTransport {
        &self.transport
    }

    pub fn status_board(&self) -> &StatusBoard {
        self.transport.status_board()
    }

    /// Cache statistics, `None` when the cache is disabled.
    pub fn cache_stats(&self) -> Option<Result<CacheStats, CacheError>> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Claims a slot for a new run, `None` when all slots are taken.
    pub fn try_reserve_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.run_slots).try_acquire_owned().ok()
    }

    /// Waits until a slot is free.
    pub async fn reserve_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.run_slots).acquire_owned().await.ok()
    }

    pub fn active_runs(&self) -> usize {
        self.config
            .server
            .max_concurrent_runs
            .saturating_sub(self.run_slots.available_permits())
    }

    pub async fn insert_run(&self, record: RunRecord) {
        self.runs.write().await.insert(record.id.clone(), record);
    }

    pub async fn get_run(&self, id: &str) -> Option<RunRecord> {
        self.runs.read().await.get(id).cloned()
    }

    /// All known runs, newest first.
    pub async fn list_runs(&self) -> Vec<RunRecord> {
        let mut runs: Vec<RunRecord> = self.runs.read().await.values().cloned().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs
    }

    pub async fn finish_run(&self, id: &str, result: Result<RunSummary, RunError>) {
        let evicted = {
            let mut runs = self.runs.write().await;
            if let Some(record) = runs.get_mut(id) {
                match result {
                    Ok(summary) => record.summary = Some(summary),
                    Err(e) => record.error = Some(e.to_string()),
                }
            }
            evict_finished(&mut runs, self.config.server.retained_runs)
        };

        for id in evicted {
            self.status_board().remove(&id).await;
        }
    }
}

/// Drops the oldest finished runs beyond `keep`; returns their ids.
fn evict_finished(runs: &mut HashMap<String, RunRecord>, keep: usize) -> Vec<String> {
    let mut finished: Vec<(DateTime<Utc>, String)> = runs
        .values()
        .filter(|r| r.is_finished())
        .map(|r| (r.created_at, r.id.clone()))
        .collect();
    if finished.len() <= keep {
        return Vec::new();
    }

    finished.sort();
    let excess = finished.len() - keep;
    finished
        .into_iter()
        .take(excess)
        .map(|(_, id)| {
            runs.remove(&id);
            id
        })
        .collect()
}
