//! Filesystem-backed transport.
//!
//! Each collection is a directory under `source_root`; archives are copied
//! into `<outbox_dir>/<source>/` and status lines go to a [`StatusBoard`].

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::config::DirectoryTransportConfig;
use super::error::TransportError;
use super::status::StatusBoard;
use super::traits::Transport;
use super::types::{SourceFormat, WorkItem};

static SOURCE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid source name pattern"));

/// Key used for status lines when the transport is not bound to a run.
const UNBOUND_STATUS_KEY: &str = "default";

/// Rejects collection names that could escape the source root.
pub fn validate_source_name(name: &str) -> Result<(), TransportError> {
    if SOURCE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(TransportError::InvalidSource {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
struct Binding {
    source: String,
    status_key: String,
}

/// Transport reading collections from local directories.
#[derive(Debug, Clone)]
pub struct DirectoryTransport {
    config: DirectoryTransportConfig,
    board: StatusBoard,
    binding: Option<Binding>,
}

impl DirectoryTransport {
    pub fn new(config: DirectoryTransportConfig, board: StatusBoard) -> Self {
        Self {
            config,
            board,
            binding: None,
        }
    }

    /// Returns a copy bound to one run: archives land in the source's
    /// outbox folder and status lines are posted under `status_key`.
    pub fn for_source(&self, source: &str, status_key: &str) -> Self {
        Self {
            config: self.config.clone(),
            board: self.board.clone(),
            binding: Some(Binding {
                source: source.to_string(),
                status_key: status_key.to_string(),
            }),
        }
    }

    pub fn config(&self) -> &DirectoryTransportConfig {
        &self.config
    }

    pub fn status_board(&self) -> &StatusBoard {
        &self.board
    }

    fn outbox(&self) -> PathBuf {
        match &self.binding {
            Some(binding) => self.config.outbox_dir.join(&binding.source),
            None => self.config.outbox_dir.clone(),
        }
    }

    fn status_key(&self) -> &str {
        self.binding
            .as_ref()
            .map(|b| b.status_key.as_str())
            .unwrap_or(UNBOUND_STATUS_KEY)
    }
}

/// First 16 hex chars of SHA-256 over the file name and contents.
fn content_id_for(file_name: &str, contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(contents);
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

#[async_trait]
impl Transport for DirectoryTransport {
    fn name(&self) -> &str {
        "directory"
    }

    async fn list_items(&self, source: &str) -> Result<Vec<WorkItem>, TransportError> {
        validate_source_name(source)?;

        let dir = self.config.source_root.join(source);
        if !tokio::fs::metadata(&dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(TransportError::SourceNotFound {
                name: source.to_string(),
            });
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            let contents = tokio::fs::read(&path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            items.push(WorkItem::new(
                content_id_for(&file_name, &contents),
                path.to_string_lossy(),
                SourceFormat::from_path(&path),
            ));
        }

        debug!(source = %source, count = items.len(), "Listed collection");
        Ok(items)
    }

    async fn fetch_raw(&self, item: &WorkItem) -> Result<PathBuf, TransportError> {
        let source = Path::new(&item.fetch_ref);
        if !source.starts_with(&self.config.source_root) {
            return Err(TransportError::fetch_failed(
                &item.fetch_ref,
                "reference is outside the source root",
            ));
        }

        tokio::fs::create_dir_all(&self.config.download_dir).await?;
        let dest = self
            .config
            .download_dir
            .join(format!("{}.{}", Uuid::new_v4(), item.format.extension()));

        tokio::fs::copy(source, &dest)
            .await
            .map_err(|e| TransportError::fetch_failed(&item.fetch_ref, e.to_string()))?;

        Ok(dest)
    }

    async fn send_archive(&self, archive: &Path) -> Result<(), TransportError> {
        let size_bytes = tokio::fs::metadata(archive).await?.len();
        let limit_bytes = self.config.max_archive_bytes;
        if limit_bytes > 0 && size_bytes > limit_bytes {
            return Err(TransportError::ArchiveTooLarge {
                size_bytes,
                limit_bytes,
            });
        }

        let file_name = archive
            .file_name()
            .ok_or_else(|| TransportError::send_failed("archive path has no file name"))?;
        let outbox = self.outbox();
        tokio::fs::create_dir_all(&outbox).await?;
        let dest = outbox.join(file_name);
        tokio::fs::copy(archive, &dest)
            .await
            .map_err(|e| TransportError::send_failed(e.to_string()))?;

        info!(archive = %dest.display(), size_bytes, "Delivered archive");
        Ok(())
    }

    async fn update_status(&self, text: &str) -> Result<(), TransportError> {
        self.board.set(self.status_key(), text).await;
        Ok(())
    }
}
