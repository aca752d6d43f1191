use std::io::{self, Write};
use std::path::{Path, PathBuf};

use gridproof_common::{GridproofError, Result};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A persisted screenshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub path: PathBuf,
    pub bytes: u64,
    /// Hex BLAKE3 digest of the file contents.
    pub blake3: String,
}

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// Write `png` to `path`, replacing any previous file.
///
/// Missing parent directories are created. The bytes go to a temporary file
/// in the destination directory first and are renamed into place, so a
/// failed write never leaves a truncated artifact behind.
pub fn write_artifact(path: &Path, png: &[u8]) -> Result<ArtifactRecord> {
    let wrap = |source: io::Error| GridproofError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(wrap)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(png).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;

    let record = ArtifactRecord {
        path: path.to_path_buf(),
        bytes: png.len() as u64,
        blake3: blake3::hash(png).to_hex().to_string(),
    };
    info!(
        target: "gridproof.flow",
        path = %record.path.display(),
        bytes = record.bytes,
        blake3 = %record.blake3,
        "artifact written"
    );
    Ok(record)
}

/// [`write_artifact`] on the blocking pool.
pub async fn write_artifact_async(path: PathBuf, png: Vec<u8>) -> Result<ArtifactRecord> {
    let dest = path.clone();
    tokio::task::spawn_blocking(move || write_artifact(&dest, &png))
        .await
        .map_err(|e| GridproofError::ArtifactWrite {
            path,
            source: io::Error::other(e),
        })?
}
