//! The archive-backed [`SnapshotSource`].

use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, instrument};

use codejudge_core::error::{EvalError, Result};
use codejudge_core::model::RepositorySnapshot;
use codejudge_core::traits::SnapshotSource;

use crate::archive::{ArchiveFetcher, FetchConfig};
use crate::extract::unpack;
use crate::snapshot::{SnapshotBuilder, SnapshotConfig};

/// Downloads a repository zipball, extracts it into a scratch directory and
/// snapshots the tree.
///
/// The scratch directory lives for one call and is removed when the call
/// returns, whether or not it succeeded.
#[derive(Debug, Clone)]
pub struct ArchiveSnapshotSource {
    fetcher: ArchiveFetcher,
    builder: SnapshotBuilder,
    scratch_root: Option<PathBuf>,
}

impl ArchiveSnapshotSource {
    pub fn new(fetch: FetchConfig, snapshot: SnapshotConfig) -> Result<Self> {
        Ok(Self {
            fetcher: ArchiveFetcher::new(fetch)?,
            builder: SnapshotBuilder::new(snapshot),
            scratch_root: None,
        })
    }

    /// Create per-call work directories under `root` instead of the system
    /// temp directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn workdir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("codejudge-");
        let workdir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        workdir.map_err(|e| EvalError::Extract(format!("failed to create work directory: {e}")))
    }
}

#[async_trait]
impl SnapshotSource for ArchiveSnapshotSource {
    #[instrument(skip(self), fields(repository = %repository_url))]
    async fn snapshot(&self, repository_url: &str) -> Result<RepositorySnapshot> {
        let workdir = self.workdir()?;
        let archive = workdir.path().join("repo.zip");
        let root = workdir.path().join("repo");

        self.fetcher.fetch(repository_url, &archive).await?;
        let extracted = unpack(archive, root.clone()).await?;
        debug!(files = extracted, "archive unpacked");

        self.builder.build_blocking(root).await
    }
}
