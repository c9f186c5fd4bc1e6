//! Shared board of status lines, one per run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The latest status line posted for a key.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub text: String,
    pub updated_at: DateTime<Utc>,
    /// How many times the line was replaced.
    pub updates: u64,
}

/// In-memory status lines keyed by run id.
///
/// Stands in for an editable chat message: every update replaces the
/// previous text.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    entries: Arc<RwLock<HashMap<String, StatusEntry>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: &str, text: &str) {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.to_string()).or_insert_with(|| StatusEntry {
            text: String::new(),
            updated_at: Utc::now(),
            updates: 0,
        });
        entry.text = text.to_string();
        entry.updated_at = Utc::now();
        entry.updates += 1;
    }

    pub async fn get(&self, key: &str) -> Option<StatusEntry> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn remove(&self, key: &str) -> Option<StatusEntry> {
        self.entries.write().await.remove(key)
    }
}
