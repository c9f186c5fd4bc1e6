//! SQLite-indexed content cache with artifacts stored as files.
//!
//! Layout under the cache directory:
//! - `blobs/<content_id>.<ext>`: cached artifacts
//! - `tmp/<uuid>.<ext>`: copies handed out by [`ContentCache::lookup`]

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CacheError, CacheStats, ContentCache};

/// SQLite-backed content cache.
pub struct SqliteContentCache {
    conn: Mutex<Connection>,
    blob_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl SqliteContentCache {
    /// Opens (or creates) the index at `db_path` with artifacts under `dir`.
    pub fn new(db_path: &Path, dir: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn, dir)
    }

    /// In-memory index (useful for testing); artifacts still live under `dir`.
    pub fn in_memory(dir: &Path) -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?, dir)
    }

    fn with_connection(conn: Connection, dir: &Path) -> Result<Self, CacheError> {
        Self::initialize_schema(&conn)?;
        let blob_dir = dir.join("blobs");
        let tmp_dir = dir.join("tmp");
        std::fs::create_dir_all(&blob_dir)?;
        std::fs::create_dir_all(&tmp_dir)?;
        Ok(Self {
            conn: Mutex::new(conn),
            blob_dir,
            tmp_dir,
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS artifact_cache (
                content_id TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                extension TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                last_hit_at TEXT,
                hit_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_artifact_cache_created ON artifact_cache(created_at);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Database("connection lock poisoned".to_string()))
    }

    fn blob_path(&self, content_id: &str, extension: &str) -> PathBuf {
        self.blob_dir.join(format!("{}.{}", content_id, extension))
    }

    fn cached_extension(&self, content_id: &str) -> Result<Option<String>, CacheError> {
        let conn = self.conn()?;
        let ext = conn
            .query_row(
                "SELECT extension FROM artifact_cache WHERE content_id = ?1",
                params![content_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(ext)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let conn = self.conn()?;
        let stats = conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(size_bytes), 0), COALESCE(SUM(hit_count), 0),
                   MIN(created_at), MAX(created_at)
            FROM artifact_cache
            "#,
            [],
            |row| {
                Ok(CacheStats {
                    entries: row.get::<_, i64>(0)? as u64,
                    total_bytes: row.get::<_, i64>(1)? as u64,
                    total_hits: row.get::<_, i64>(2)? as u64,
                    oldest_entry: row.get(3)?,
                    newest_entry: row.get(4)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Removes an entry and its artifact. Returns whether it existed.
    pub fn remove(&self, content_id: &str) -> Result<bool, CacheError> {
        let Some(ext) = self.cached_extension(content_id)? else {
            return Ok(false);
        };
        self.conn()?.execute(
            "DELETE FROM artifact_cache WHERE content_id = ?1",
            params![content_id],
        )?;
        remove_if_exists(&self.blob_path(content_id, &ext))?;
        Ok(true)
    }

    /// Clears every entry and artifact.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.conn()?.execute("DELETE FROM artifact_cache", [])?;
        for entry in std::fs::read_dir(&self.blob_dir)? {
            let path = entry?.path();
            if path.is_file() {
                remove_if_exists(&path)?;
            }
        }
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ContentCache for SqliteContentCache {
    async fn lookup(&self, content_id: &str) -> Result<Option<PathBuf>, CacheError> {
        let Some(ext) = self.cached_extension(content_id)? else {
            return Ok(None);
        };

        let blob = self.blob_path(content_id, &ext);
        let copy = self.tmp_dir.join(format!("{}.{}", Uuid::new_v4(), ext));
        match tokio::fs::copy(&blob, &copy).await {
            Ok(_) => {
                self.conn()?.execute(
                    "UPDATE artifact_cache SET hit_count = hit_count + 1, last_hit_at = ?2 WHERE content_id = ?1",
                    params![content_id, Utc::now().to_rfc3339()],
                )?;
                debug!(content_id, "Cache hit");
                Ok(Some(copy))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(content_id, blob = %blob.display(), "Cached artifact missing, dropping entry");
                self.conn()?.execute(
                    "DELETE FROM artifact_cache WHERE content_id = ?1",
                    params![content_id],
                )?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, content_id: &str, artifact: &Path) -> Result<(), CacheError> {
        let ext = artifact
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                CacheError::InvalidArtifact(format!("{} has no extension", artifact.display()))
            })?
            .to_ascii_lowercase();
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(previous) = self.cached_extension(content_id)? {
            if previous != ext {
                remove_if_exists(&self.blob_path(content_id, &previous))?;
            }
        }

        let blob = self.blob_path(content_id, &ext);
        let partial = self.blob_dir.join(format!("{}.{}.partial", content_id, ext));
        let size_bytes = tokio::fs::copy(artifact, &partial).await?;
        tokio::fs::rename(&partial, &blob).await?;

        self.conn()?.execute(
            r#"
            INSERT INTO artifact_cache (content_id, file_name, extension, size_bytes, created_at, hit_count)
            VALUES (?1, ?2, ?3, ?4, ?5, 0)
            ON CONFLICT(content_id) DO UPDATE SET
                file_name = excluded.file_name,
                extension = excluded.extension,
                size_bytes = excluded.size_bytes,
                created_at = excluded.created_at
            "#,
            params![
                content_id,
                file_name,
                ext,
                size_bytes as i64,
                Utc::now().to_rfc3339()
            ],
        )?;

        debug!(content_id, size_bytes, "Stored artifact in cache");
        Ok(())
    }
}
