//! Content cache API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use packforge_core::CacheStats;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub enabled: bool,
    #[serde(flatten)]
    pub stats: Option<CacheStats>,
}

#[derive(Debug, Serialize)]
pub struct CacheErrorResponse {
    pub error: String,
}

/// Get cache statistics
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CacheStatsResponse>, impl IntoResponse> {
    match state.cache_stats() {
        None => Ok(Json(CacheStatsResponse {
            enabled: false,
            stats: None,
        })),
        Some(Ok(stats)) => Ok(Json(CacheStatsResponse {
            enabled: true,
            stats: Some(stats),
        })),
        Some(Err(e)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CacheErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}
