//! File moves and folder cleanup.

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Attempts a rename. Returns `Ok(false)` when source and destination are
/// on different filesystems.
async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, io::Error> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(true),
        Err(e) => {
            // EXDEV is 18 on Linux
            if e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                Ok(false)
            } else {
                Err(e)
            }
        }
    }
}

/// Moves a file, falling back to copy and delete when the rename fails.
pub(crate) async fn move_file(source: &Path, destination: &Path) -> Result<(), io::Error> {
    match try_atomic_move(source, destination).await {
        Ok(true) => return Ok(()),
        Ok(false) => {}
        Err(e) => debug!(source = %source.display(), error = %e, "Rename failed, copying instead"),
    }
    fs::copy(source, destination).await?;
    fs::remove_file(source).await
}

/// Recursively removes a folder. A folder that is already gone is fine.
pub async fn purge_dir(path: &Path) -> Result<(), io::Error> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
