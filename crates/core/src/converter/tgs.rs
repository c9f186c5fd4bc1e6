//! TGS payload handling.
//!
//! A TGS sticker is a gzip-compressed Lottie JSON document.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use super::error::ConverterError;

/// Decompresses a TGS file into its Lottie JSON document at `json_path`.
pub fn decode_tgs(tgs_path: &Path, json_path: &Path) -> Result<u64, ConverterError> {
    let file = File::open(tgs_path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ConverterError::InputNotFound {
                path: tgs_path.to_path_buf(),
            }
        } else {
            ConverterError::Io(e)
        }
    })?;

    let mut json = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut json)
        .map_err(|e| ConverterError::tgs_decode(e.to_string()))?;

    let mut out = File::create(json_path)?;
    out.write_all(&json)?;
    out.flush()?;
    Ok(json.len() as u64)
}
