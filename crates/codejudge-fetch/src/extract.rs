//! Zip extraction confined to a destination directory.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use codejudge_core::error::{EvalError, Result};

/// Extract every entry of `archive_path` below `destination`.
///
/// Entries whose names would escape `destination` are skipped. Returns the
/// number of files written. Blocking; see [`unpack`] for async callers.
pub fn extract_zip(archive_path: &Path, destination: &Path) -> Result<usize> {
    let file = File::open(archive_path)
        .map_err(|e| EvalError::Extract(format!("failed to open archive: {e}")))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| EvalError::Extract(format!("not a zip archive: {e}")))?;

    fs::create_dir_all(destination)?;
    let mut written = 0;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| EvalError::Extract(format!("corrupt entry {index}: {e}")))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = %entry.name(), "skipping archive entry outside extraction root");
            continue;
        };
        let target = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    debug!(files = written, destination = %destination.display(), "archive extracted");
    Ok(written)
}

/// [`extract_zip`] on the blocking thread pool.
pub async fn unpack(archive_path: PathBuf, destination: PathBuf) -> Result<usize> {
    tokio::task::spawn_blocking(move || extract_zip(&archive_path, &destination))
        .await
        .map_err(|e| EvalError::Extract(format!("extraction task failed: {e}")))?
}
