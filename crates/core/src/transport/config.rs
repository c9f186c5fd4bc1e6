//! Configuration for the directory transport.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`DirectoryTransport`](super::DirectoryTransport).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryTransportConfig {
    /// Root directory holding one subdirectory per collection.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Archives are delivered to `<outbox_dir>/<source>/`.
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,

    /// Where raw fetches are written before conversion.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Largest archive the transport accepts, in bytes (0 = unlimited).
    #[serde(default)]
    pub max_archive_bytes: u64,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("./sources")
}

fn default_outbox_dir() -> PathBuf {
    PathBuf::from("./outbox")
}

fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join("packforge-downloads")
}

impl Default for DirectoryTransportConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            outbox_dir: default_outbox_dir(),
            download_dir: default_download_dir(),
            max_archive_bytes: 0,
        }
    }
}

impl DirectoryTransportConfig {
    pub fn with_source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_root = path.into();
        self
    }

    pub fn with_outbox_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.outbox_dir = path.into();
        self
    }

    pub fn with_download_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_dir = path.into();
        self
    }

    pub fn with_max_archive_bytes(mut self, limit: u64) -> Self {
        self.max_archive_bytes = limit;
        self
    }
}
