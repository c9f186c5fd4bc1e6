//! Content cache for converted artifacts.
//!
//! Keyed by an item's content id. A hit hands the caller a private temp copy
//! of the cached artifact, which the caller then owns and must remove.

mod noop;
mod sqlite;
mod types;

pub use noop::NoopContentCache;
pub use sqlite::SqliteContentCache;
pub use types::{CacheError, CacheStats};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Cache of converted artifacts shared across runs.
#[async_trait]
pub trait ContentCache: Send + Sync {
    /// Returns a temp copy of the cached artifact, or `None` on a miss.
    ///
    /// The returned path carries the cached artifact's extension.
    async fn lookup(&self, content_id: &str) -> Result<Option<PathBuf>, CacheError>;

    /// Stores a copy of `artifact` under `content_id`, replacing any previous entry.
    async fn store(&self, content_id: &str, artifact: &Path) -> Result<(), CacheError>;
}
