//! Git integration for catalog working copies.
//!
//! [`SourceControl`] is the primitive layer, [`GitCli`] its process-backed
//! implementation, and [`RepositorySync`] the reconciliation step that
//! brings a working copy back to the upstream tip.

mod cli_adapter;
mod operations;
mod sync;

pub use cli_adapter::GitCli;
pub use operations::{CommitOutcome, PushMode, SourceControl};
pub use sync::{OriginSource, RepositorySync, SyncReport};

use crate::error::GitError;

/// Result of an idempotent creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    /// The object was created by this call
    Created,
    /// The object existed already
    AlreadyPresent,
}

/// Attempt a creation and treat "already exists" as success.
///
/// Any other failure is returned unchanged.
pub fn ensure(result: Result<(), GitError>) -> Result<Ensured, GitError> {
    match result {
        Ok(()) => Ok(Ensured::Created),
        Err(e) if e.is_already_exists() => {
            log::debug!("{e}");
            Ok(Ensured::AlreadyPresent)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_maps_already_exists() {
        assert_eq!(ensure(Ok(())).unwrap(), Ensured::Created);
        let exists = GitError::AlreadyExists {
            operation: "remote add".to_string(),
            name: "upstream".to_string(),
        };
        assert_eq!(ensure(Err(exists)).unwrap(), Ensured::AlreadyPresent);
    }

    #[test]
    fn test_ensure_propagates_other_failures() {
        let failed = GitError::Failed {
            operation: "remote".to_string(),
            code: 128,
            stderr: "fatal: not a git repository".to_string(),
        };
        assert!(matches!(ensure(Err(failed)), Err(GitError::Failed { .. })));
    }
}
