//! Two-step push: safe first, forced as a fallback.

use crate::error::GitError;
use crate::git::{PushMode, SourceControl};

/// How a branch push ended
#[derive(Debug)]
pub enum PushOutcome {
    /// `--force-with-lease` succeeded
    SafePushed,
    /// The safe push was rejected and `--force` succeeded
    ForcedPushed,
    /// The safe push failed for another reason than a rejection, or the
    /// forced push failed too; holds the last error
    Failed(GitError),
}

/// Push `branch` to `remote` with upstream tracking.
///
/// A branch left behind by an earlier run may have diverged (it was rebuilt
/// from a newer upstream tip), which the lease rejects; the proposal branch
/// belongs to this tool, so it is then overwritten. Any other failure
/// (auth, network) is returned without forcing.
pub async fn push_with_fallback<G: SourceControl>(git: &G, remote: &str, branch: &str) -> PushOutcome {
    match git.push(remote, branch, PushMode::Safe).await {
        Ok(()) => return PushOutcome::SafePushed,
        Err(e @ GitError::PushRejected { .. }) => {
            log::warn!("safe push of {branch} rejected, retrying with --force: {e}")
        }
        Err(e) => return PushOutcome::Failed(e),
    }

    match git.push(remote, branch, PushMode::Forced).await {
        Ok(()) => PushOutcome::ForcedPushed,
        Err(e) => PushOutcome::Failed(e),
    }
}
