//! Run API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use packforge_core::{validate_source_name, RunRequest, RunState, RunSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics::RUNS_REJECTED_TOTAL;
use crate::state::{AppState, RunRecord};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting a run
#[derive(Debug, Deserialize)]
pub struct CreateRunBody {
    /// Name of the collection to process
    pub source: String,
}

/// Response for run operations
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub id: String,
    pub source: String,
    pub created_at: String,
    pub state: RunState,
    /// Latest status line posted by the run
    pub status: Option<String>,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

/// Response for listing runs
#[derive(Debug, Serialize)]
pub struct ListRunsResponse {
    pub runs: Vec<RunResponse>,
    pub active: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct RunErrorResponse {
    pub error: String,
}

async fn to_response(state: &AppState, record: RunRecord) -> RunResponse {
    let status = state.status_board().get(&record.id).await.map(|e| e.text);
    RunResponse {
        state: record.current_state(),
        id: record.id,
        source: record.source,
        created_at: record.created_at.to_rfc3339(),
        status,
        summary: record.summary,
        error: record.error,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a run in the background
pub async fn create_run(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRunBody>,
) -> Result<(StatusCode, Json<RunResponse>), impl IntoResponse> {
    if let Err(e) = validate_source_name(&body.source) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(RunErrorResponse {
                error: e.to_string(),
            }),
        ));
    }

    // With queueing on, the slot is claimed by the spawned task instead.
    let permit = if state.config().server.queue_when_busy {
        None
    } else {
        let Some(permit) = state.try_reserve_slot() else {
            RUNS_REJECTED_TOTAL.inc();
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(RunErrorResponse {
                    error: format!(
                        "Too many runs in progress (limit {})",
                        state.config().server.max_concurrent_runs
                    ),
                }),
            ));
        };
        Some(permit)
    };

    let run_id = Uuid::new_v4().to_string();
    let (tx, rx) = watch::channel(RunState::Created);
    let record = RunRecord::new(&run_id, &body.source, rx);
    state.insert_run(record.clone()).await;

    let transport = Arc::new(state.transport().for_source(&body.source, &run_id));
    let request = RunRequest::new(&body.source, transport)
        .with_run_id(&run_id)
        .with_state_channel(tx);

    info!(run_id = %run_id, source = %body.source, "Run accepted");

    let app = Arc::clone(&state);
    tokio::spawn(async move {
        let permit = match permit {
            Some(permit) => Some(permit),
            None => app.reserve_slot().await,
        };
        let Some(_permit) = permit else {
            warn!(run_id = %run_id, "Run slots closed, dropping run");
            return;
        };
        let result = app.supervisor().run(request).await;
        match &result {
            Ok(summary) => info!(
                run_id = %summary.run_id,
                outcome = ?summary.outcome,
                finished = summary.finished,
                failed = summary.failed,
                uploaded_batches = summary.uploaded_batches,
                "Run finished"
            ),
            Err(e) => warn!(run_id = %run_id, error = %e, "Run failed"),
        }
        app.finish_run(&run_id, result).await;
    });

    Ok((StatusCode::ACCEPTED, Json(to_response(&state, record).await)))
}

/// Get a run by ID
pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RunResponse>, impl IntoResponse> {
    match state.get_run(&id).await {
        Some(record) => Ok(Json(to_response(&state, record).await)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(RunErrorResponse {
                error: format!("Run not found: {}", id),
            }),
        )),
    }
}

/// List runs, newest first
pub async fn list_runs(State(state): State<Arc<AppState>>) -> Json<ListRunsResponse> {
    let mut runs = Vec::new();
    for record in state.list_runs().await {
        runs.push(to_response(&state, record).await);
    }
    Json(ListRunsResponse {
        runs,
        active: state.active_runs(),
    })
}
