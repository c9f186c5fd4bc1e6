//! Zip archives of batch folders.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Compresses every regular file directly under `src_dir` into `archive_path`.
///
/// Entries are named by file name and written in sorted order. Returns the
/// size of the finished archive.
pub(crate) fn compress_dir(src_dir: &Path, archive_path: &Path) -> zip::result::ZipResult<u64> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(src_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut writer = ZipWriter::new(File::create(archive_path)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer.start_file(name, options)?;
        let mut reader = BufReader::new(File::open(path)?);
        io::copy(&mut reader, &mut writer)?;
    }

    writer.finish()?;
    Ok(std::fs::metadata(archive_path)?.len())
}
