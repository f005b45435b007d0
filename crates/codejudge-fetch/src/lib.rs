//! codejudge-fetch: repository archives and source snapshots.
//!
//! Downloads a repository's zipball, unpacks it on the blocking pool and
//! reduces the tree to a bounded list of file snippets for the judge.

pub mod archive;
pub mod extract;
pub mod snapshot;
pub mod source;

pub use archive::{parse_repository_reference, ArchiveFetcher, FetchConfig, RepoRef};
pub use snapshot::{SnapshotBuilder, SnapshotConfig};
pub use source::ArchiveSnapshotSource;
