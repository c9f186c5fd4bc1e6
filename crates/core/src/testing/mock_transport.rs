//! Mock transport for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::transport::{Transport, TransportError, WorkItem};

/// An archive the mock received, inspected at delivery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentArchive {
    pub file_name: String,
    pub size_bytes: u64,
    /// Entry names inside the zip, in archive order.
    pub entries: Vec<String>,
}

/// Mock implementation of the Transport trait.
///
/// Fetches write the item's `fetch_ref` bytes into a private download
/// folder; sent archives and status lines are recorded for assertions.
///
/// # Example
///
/// ```rust,ignore
/// use packforge_core::testing::{fixtures, MockTransport};
///
/// let transport = MockTransport::new();
/// transport.set_items(fixtures::work_items(10, SourceFormat::Webp)).await;
/// transport.fail_fetch_for("item-3").await;
///
/// // ... run ...
///
/// assert_eq!(transport.sent_archives().await.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    items: Arc<RwLock<Vec<WorkItem>>>,
    fail_listing: Arc<RwLock<bool>>,
    fetch_failures: Arc<RwLock<HashSet<String>>>,
    fetch_delay_ms: Arc<RwLock<u64>>,
    fetch_count: Arc<AtomicUsize>,
    send_failures_remaining: Arc<RwLock<usize>>,
    sent: Arc<RwLock<Vec<SentArchive>>>,
    fail_status_updates: Arc<RwLock<bool>>,
    statuses: Arc<RwLock<Vec<String>>>,
    download_dir: PathBuf,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a new mock transport downloading into a fresh temp folder.
    pub fn new() -> Self {
        Self::with_download_dir(
            std::env::temp_dir().join(format!("packforge-mock-{}", Uuid::new_v4())),
        )
    }

    pub fn with_download_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            fail_listing: Arc::new(RwLock::new(false)),
            fetch_failures: Arc::new(RwLock::new(HashSet::new())),
            fetch_delay_ms: Arc::new(RwLock::new(0)),
            fetch_count: Arc::new(AtomicUsize::new(0)),
            send_failures_remaining: Arc::new(RwLock::new(0)),
            sent: Arc::new(RwLock::new(Vec::new())),
            fail_status_updates: Arc::new(RwLock::new(false)),
            statuses: Arc::new(RwLock::new(Vec::new())),
            download_dir: dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub async fn set_items(&self, items: Vec<WorkItem>) {
        *self.items.write().await = items;
    }

    pub async fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.write().await = fail;
    }

    /// Make every fetch of `content_id` fail.
    pub async fn fail_fetch_for(&self, content_id: &str) {
        self.fetch_failures
            .write()
            .await
            .insert(content_id.to_string());
    }

    pub async fn set_fetch_delay(&self, delay_ms: u64) {
        *self.fetch_delay_ms.write().await = delay_ms;
    }

    /// Make the next `count` deliveries fail.
    pub async fn fail_next_sends(&self, count: usize) {
        *self.send_failures_remaining.write().await = count;
    }

    pub async fn set_fail_status_updates(&self, fail: bool) {
        *self.fail_status_updates.write().await = fail;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub async fn sent_archives(&self) -> Vec<SentArchive> {
        self.sent.read().await.clone()
    }

    pub async fn statuses(&self) -> Vec<String> {
        self.statuses.read().await.clone()
    }

    pub async fn last_status(&self) -> Option<String> {
        self.statuses.read().await.last().cloned()
    }
}

fn zip_entries(path: &Path) -> Result<Vec<String>, zip::result::ZipError> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path)?)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_string());
    }
    Ok(names)
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_items(&self, source: &str) -> Result<Vec<WorkItem>, TransportError> {
        if *self.fail_listing.read().await {
            return Err(TransportError::SourceNotFound {
                name: source.to_string(),
            });
        }
        Ok(self.items.read().await.clone())
    }

    async fn fetch_raw(&self, item: &WorkItem) -> Result<PathBuf, TransportError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let delay = *self.fetch_delay_ms.read().await;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fetch_failures.read().await.contains(&item.content_id) {
            return Err(TransportError::fetch_failed(&item.fetch_ref, "mock fetch failure"));
        }

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self
            .download_dir
            .join(format!("{}.{}", Uuid::new_v4(), item.format.extension()));
        tokio::fs::write(&path, item.fetch_ref.as_bytes()).await?;
        Ok(path)
    }

    async fn send_archive(&self, archive: &Path) -> Result<(), TransportError> {
        {
            let mut remaining = self.send_failures_remaining.write().await;
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::send_failed("mock send failure"));
            }
        }

        let size_bytes = tokio::fs::metadata(archive).await?.len();
        let path = archive.to_path_buf();
        let entries = tokio::task::spawn_blocking(move || zip_entries(&path))
            .await
            .map_err(|e| TransportError::send_failed(e.to_string()))?
            .map_err(|e| TransportError::send_failed(e.to_string()))?;

        self.sent.write().await.push(SentArchive {
            file_name: archive
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes,
            entries,
        });
        Ok(())
    }

    async fn update_status(&self, text: &str) -> Result<(), TransportError> {
        if *self.fail_status_updates.read().await {
            return Err(TransportError::StatusFailed {
                reason: "mock status failure".to_string(),
            });
        }
        self.statuses.write().await.push(text.to_string());
        Ok(())
    }
}
