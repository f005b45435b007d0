//! Bounded, deterministic snapshots of an extracted source tree.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use codejudge_core::error::{EvalError, Result};
use codejudge_core::model::{RepositorySnapshot, SnapshotFile};

pub const DEFAULT_MAX_FILES: usize = 50;
pub const DEFAULT_MAX_FILE_BYTES: u64 = 200_000;
pub const DEFAULT_MAX_CHARS: usize = 2000;

/// Snapshot bounds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Maximum number of entries.
    pub max_files: usize,
    /// Files above this size are skipped without taking a slot.
    pub max_file_bytes: u64,
    /// Snippet length in characters.
    pub max_chars: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// Walks an extraction root and collects file snippets.
///
/// Directory entries are visited depth-first in file-name order so the same
/// tree always yields the same snapshot. Only regular files count; symlinks
/// and special files are ignored.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    config: SnapshotConfig,
}

impl SnapshotBuilder {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    /// Build a snapshot of `root`. Blocking.
    pub fn build(&self, root: &Path) -> Result<RepositorySnapshot> {
        let mut files = Vec::new();
        if self.config.max_files > 0 {
            self.walk(root, root, &mut files)?;
        }
        debug!(root = %root.display(), files = files.len(), "snapshot built");
        Ok(files)
    }

    /// [`SnapshotBuilder::build`] on the blocking thread pool.
    pub async fn build_blocking(&self, root: PathBuf) -> Result<RepositorySnapshot> {
        let builder = self.clone();
        tokio::task::spawn_blocking(move || builder.build(&root))
            .await
            .map_err(|e| EvalError::Extract(format!("snapshot task failed: {e}")))?
    }

    /// Returns `true` once the entry limit is reached.
    fn walk(&self, root: &Path, dir: &Path, files: &mut Vec<SnapshotFile>) -> Result<bool> {
        let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let meta = fs::symlink_metadata(&path)?;

            if meta.is_dir() {
                if self.walk(root, &path, files)? {
                    return Ok(true);
                }
                continue;
            }
            if !meta.is_file() {
                continue;
            }
            if meta.len() > self.config.max_file_bytes {
                debug!(path = %path.display(), bytes = meta.len(), "skipping large file");
                continue;
            }

            let bytes = fs::read(&path)?;
            let text = String::from_utf8_lossy(&bytes);
            files.push(SnapshotFile {
                path: relative_path(root, &path),
                snippet: truncate_chars(&text, self.config.max_chars).to_string(),
            });
            if files.len() >= self.config.max_files {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// `path` relative to `root`, `/`-separated.
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
