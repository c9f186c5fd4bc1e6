//! Mock content cache for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::cache::{CacheError, ContentCache};

/// Mock implementation of the ContentCache trait.
///
/// Blobs live under a private folder. Entries can be seeded directly, made
/// "stale" (lookup hands out a copy that no longer exists), or lookups can
/// be made to fail outright.
#[derive(Debug, Clone)]
pub struct MockContentCache {
    dir: PathBuf,
    entries: Arc<RwLock<HashMap<String, PathBuf>>>,
    stale: Arc<RwLock<HashSet<String>>>,
    fail_lookups: Arc<RwLock<bool>>,
    stored: Arc<RwLock<Vec<String>>>,
}

impl Default for MockContentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContentCache {
    pub fn new() -> Self {
        Self::with_dir(std::env::temp_dir().join(format!("packforge-mock-cache-{}", Uuid::new_v4())))
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: Arc::new(RwLock::new(HashMap::new())),
            stale: Arc::new(RwLock::new(HashSet::new())),
            fail_lookups: Arc::new(RwLock::new(false)),
            stored: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed an entry with the given bytes.
    pub async fn insert(&self, content_id: &str, extension: &str, bytes: &[u8]) {
        let blob = self.dir.join(format!("{}.{}", content_id, extension));
        if tokio::fs::create_dir_all(&self.dir).await.is_ok()
            && tokio::fs::write(&blob, bytes).await.is_ok()
        {
            self.entries
                .write()
                .await
                .insert(content_id.to_string(), blob);
        }
    }

    /// Make lookups of `content_id` hit with a copy that has already vanished.
    pub async fn insert_stale(&self, content_id: &str) {
        self.stale.write().await.insert(content_id.to_string());
    }

    pub async fn set_fail_lookups(&self, fail: bool) {
        *self.fail_lookups.write().await = fail;
    }

    /// Content ids passed to `store`, in call order.
    pub async fn stored_ids(&self) -> Vec<String> {
        self.stored.read().await.clone()
    }

    pub async fn contains(&self, content_id: &str) -> bool {
        self.entries.read().await.contains_key(content_id)
    }
}

#[async_trait]
impl ContentCache for MockContentCache {
    async fn lookup(&self, content_id: &str) -> Result<Option<PathBuf>, CacheError> {
        if *self.fail_lookups.read().await {
            return Err(CacheError::Database("mock lookup failure".to_string()));
        }
        if self.stale.read().await.contains(content_id) {
            return Ok(Some(self.dir.join(format!("vanished-{}.gif", Uuid::new_v4()))));
        }

        let Some(blob) = self.entries.read().await.get(content_id).cloned() else {
            return Ok(None);
        };
        let ext = blob
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let copy = self.dir.join(format!("{}.{}", Uuid::new_v4(), ext));
        tokio::fs::copy(&blob, &copy).await?;
        Ok(Some(copy))
    }

    async fn store(&self, content_id: &str, artifact: &Path) -> Result<(), CacheError> {
        self.stored.write().await.push(content_id.to_string());

        let ext = artifact
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        tokio::fs::create_dir_all(&self.dir).await?;
        let blob = self.dir.join(format!("{}.{}", content_id, ext));
        tokio::fs::copy(artifact, &blob).await?;
        self.entries
            .write()
            .await
            .insert(content_id.to_string(), blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_seeded_entry_hits_with_private_copy() {
        let temp = TempDir::new().unwrap();
        let cache = MockContentCache::with_dir(temp.path());
        cache.insert("a", "png", b"png").await;

        let copy = cache.lookup("a").await.unwrap().unwrap();
        assert_eq!(copy.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&copy).unwrap(), b"png");
        assert!(cache.lookup("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_entry_points_nowhere() {
        let cache = MockContentCache::new();
        cache.insert_stale("s").await;
        let copy = cache.lookup("s").await.unwrap().unwrap();
        assert!(!copy.exists());
    }

    #[tokio::test]
    async fn test_store_records_and_hits() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("x.gif");
        std::fs::write(&artifact, b"gif").unwrap();

        let cache = MockContentCache::with_dir(temp.path().join("cache"));
        cache.store("x", &artifact).await.unwrap();

        assert_eq!(cache.stored_ids().await, vec!["x".to_string()]);
        assert!(cache.contains("x").await);
        assert!(cache.lookup("x").await.unwrap().is_some());
    }
}
