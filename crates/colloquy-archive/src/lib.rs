//! Archival of finished transcripts.
//!
//! [`ArchiveClient`] is the seam the rollover scheduler talks to;
//! [`GitHubArchive`] stores each transcript as a file in a GitHub repository.

pub mod github;

use async_trait::async_trait;
use colloquy_core::ColloquyResult;
use std::path::Path;

pub use github::{ArchiveConfig, GitHubArchive};

/// What an upload did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The remote file did not exist and was created.
    Created,
    /// An existing remote file was replaced.
    Updated,
    /// Nothing was sent.
    Skipped(SkipReason),
}

/// Why an upload was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No credential is configured.
    NoCredential,
    /// Archiving is turned off.
    Disabled,
}

/// Persists a local file to remote storage, creating or updating it.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// Uploads `file_path`, recording `commit_message` with the change.
    async fn upload(&self, file_path: &Path, commit_message: &str) -> ColloquyResult<ArchiveOutcome>;
}

/// Archive used when no remote store is configured; every upload is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledArchive;

#[async_trait]
impl ArchiveClient for DisabledArchive {
    async fn upload(&self, file_path: &Path, _commit_message: &str) -> ColloquyResult<ArchiveOutcome> {
        tracing::debug!(path = %file_path.display(), "Archiving disabled, keeping transcript local");
        Ok(ArchiveOutcome::Skipped(SkipReason::Disabled))
    }
}
