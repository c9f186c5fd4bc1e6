//! Cache that never hits and never stores.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{CacheError, ContentCache};

/// Used when caching is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopContentCache;

#[async_trait]
impl ContentCache for NoopContentCache {
    async fn lookup(&self, _content_id: &str) -> Result<Option<PathBuf>, CacheError> {
        Ok(None)
    }

    async fn store(&self, _content_id: &str, _artifact: &Path) -> Result<(), CacheError> {
        Ok(())
    }
}
