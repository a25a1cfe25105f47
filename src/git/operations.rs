//! Source control operations trait and types.
//!
//! The pipeline never talks to git directly; it goes through
//! [`SourceControl`], which the [`GitCli`](super::GitCli) adapter implements
//! by invoking the `git` executable in the working copy.

use crate::error::GitError;
use std::future::Future;
use std::path::Path;

/// Result of a commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new commit was created
    Committed {
        /// Full SHA of the new commit
        sha: String,
    },
    /// The index matched `HEAD`; no commit was created
    NothingToCommit,
}

/// How a branch is pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushMode {
    /// `--force-with-lease`: overwrite only what we last saw
    Safe,
    /// `--force`: overwrite unconditionally
    Forced,
}

impl PushMode {
    /// Git flag for this mode
    pub fn flag(&self) -> &'static str {
        match self {
            PushMode::Safe => "--force-with-lease",
            PushMode::Forced => "--force",
        }
    }
}

/// Primitive operations on one working copy.
///
/// Every method fails with a [`GitError`]; creation methods report an
/// existing object as [`GitError::AlreadyExists`] so callers can treat it
/// as success through [`ensure`](super::ensure).
pub trait SourceControl {
    /// Path of the working copy
    fn repo_path(&self) -> &Path;

    /// Whether the working copy exists (has a `.git` entry)
    fn is_cloned(&self) -> bool {
        self.repo_path().join(".git").exists()
    }

    /// Clone `url` into the working copy path; its remote is named `origin`
    fn clone_from(&self, url: &str) -> impl Future<Output = Result<(), GitError>>;

    /// URL of a remote, `None` when the remote is not configured
    fn remote_url(&self, name: &str) -> impl Future<Output = Result<Option<String>, GitError>>;

    /// Add a remote
    fn add_remote(&self, name: &str, url: &str) -> impl Future<Output = Result<(), GitError>>;

    /// Fetch all branches of a remote
    fn fetch(&self, remote: &str) -> impl Future<Output = Result<(), GitError>>;

    /// Check out an existing branch or revision
    fn checkout(&self, reference: &str, force: bool) -> impl Future<Output = Result<(), GitError>>;

    /// Create `name` at `start` and check it out (forced)
    fn create_branch(&self, name: &str, start: &str) -> impl Future<Output = Result<(), GitError>>;

    /// Reset index and working tree to `reference`, removing untracked files
    fn reset_hard(&self, reference: &str) -> impl Future<Output = Result<(), GitError>>;

    /// Read a config value, `None` when unset
    fn config_get(&self, key: &str) -> impl Future<Output = Result<Option<String>, GitError>>;

    /// Write a repository-local config value
    fn config_set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), GitError>>;

    /// Stage everything below `path` (relative to the working copy)
    fn add(&self, path: &str) -> impl Future<Output = Result<(), GitError>>;

    /// Commit the index
    fn commit(&self, message: &str) -> impl Future<Output = Result<CommitOutcome, GitError>>;

    /// Push `branch` to `remote` with upstream tracking.
    ///
    /// A rejection by the remote is [`GitError::PushRejected`].
    fn push(
        &self,
        remote: &str,
        branch: &str,
        mode: PushMode,
    ) -> impl Future<Output = Result<(), GitError>>;

    /// Full SHA of `reference`
    fn rev_parse(&self, reference: &str) -> impl Future<Output = Result<String, GitError>>;
}
