//! Change proposal: commit the patched entry on its own branch, push it,
//! and make sure exactly one open pull request carries it.
//!
//! The branch name is derived from the app id and version only, so every
//! run for the same version lands on the same branch and finds the pull
//! request an earlier run opened.

mod carry;
mod push;

pub use carry::EntrySnapshot;
pub use push::{PushOutcome, push_with_fallback};

use crate::cli::RuntimeConfig;
use crate::error::ProposalError;
use crate::git::{CommitOutcome, Ensured, SourceControl, ensure};
use crate::github::{CodeHost, NewProposal, Proposal};
use crate::repo::RepoSlug;
use crate::{ReleaseTarget, SyncConfig};

/// Result of the proposal step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// A new pull request was opened
    Created(Proposal),
    /// An open pull request received a new commit
    Updated(Proposal),
    /// Nothing new to propose; the open pull request, if any
    NoOp(Option<Proposal>),
}

impl ProposalOutcome {
    /// The pull request involved, if any
    pub fn proposal(&self) -> Option<&Proposal> {
        match self {
            ProposalOutcome::Created(p) | ProposalOutcome::Updated(p) => Some(p),
            ProposalOutcome::NoOp(p) => p.as_ref(),
        }
    }
}

/// Commits, pushes and opens or finds the pull request for a release
pub struct ChangeProposer<'a, G: SourceControl, H: CodeHost> {
    git: &'a G,
    host: &'a H,
    config: &'a SyncConfig,
    runtime: &'a RuntimeConfig,
}

impl<'a, G: SourceControl, H: CodeHost> ChangeProposer<'a, G, H> {
    /// Create a proposer
    pub fn new(git: &'a G, host: &'a H, config: &'a SyncConfig, runtime: &'a RuntimeConfig) -> Self {
        Self {
            git,
            host,
            config,
            runtime,
        }
    }

    /// Pull request title
    pub fn title(&self, target: &ReleaseTarget) -> String {
        format!("Update {} to {}", self.config.app_id, target.version)
    }

    /// Pull request body
    pub fn body(&self, target: &ReleaseTarget) -> String {
        format!(
            "Updates `{app}` to version `{version}`.\n\n\
             - Image: `{image_ref}`\n\
             - Digest: `{digest}`\n",
            app = self.config.app_id,
            version = target.version,
            image_ref = target.image_ref(&self.config.image),
            digest = target.digest,
        )
    }

    /// Commit message
    pub fn commit_message(&self, target: &ReleaseTarget) -> String {
        format!(
            "{}\n\nImage: {}",
            self.title(target),
            target.image_ref(&self.config.image)
        )
    }

    /// Propose the patched entry in the working copy.
    ///
    /// In a dry run nothing is touched and `NoOp(None)` is returned after
    /// reporting what would happen.
    pub async fn propose(
        &self,
        target: &ReleaseTarget,
        dry_run: bool,
    ) -> Result<ProposalOutcome, ProposalError> {
        let branch = self.config.branch_name(&target.version);

        if dry_run {
            self.runtime.println(&format!(
                "[dry-run] would commit {} on {branch}, push it to origin and open \"{}\" against {}:{}",
                self.config.app_id,
                self.title(target),
                self.config.upstream_repo,
                self.config.base_branch
            ));
            return Ok(ProposalOutcome::NoOp(None));
        }

        self.ensure_identity().await?;
        self.switch_to_branch(&branch).await?;

        self.git.add(&self.config.app_id).await?;
        let commit = self.git.commit(&self.commit_message(target)).await?;
        let committed = match &commit {
            CommitOutcome::Committed { sha } => {
                self.runtime.success(&format!("Committed {} on {branch}", short(sha)));
                true
            }
            CommitOutcome::NothingToCommit => {
                let head = self.git.rev_parse("HEAD").await?;
                let upstream = self.git.rev_parse(&self.config.upstream_ref()).await?;
                if head == upstream {
                    self.runtime.success(&format!(
                        "{} is already at {} upstream, nothing to propose",
                        self.config.app_id, target.version
                    ));
                    return Ok(ProposalOutcome::NoOp(None));
                }
                self.runtime
                    .println(&format!("Nothing new to commit on {branch}"));
                false
            }
        };

        match push_with_fallback(self.git, "origin", &branch).await {
            PushOutcome::SafePushed => self.runtime.success(&format!("Pushed {branch}")),
            PushOutcome::ForcedPushed => self
                .runtime
                .warn(&format!("Pushed {branch} with --force after the safe push was rejected")),
            PushOutcome::Failed(e) => {
                return Err(ProposalError::PushFailed {
                    branch,
                    reason: e.to_string(),
                });
            }
        }

        let head = format!("{}:{branch}", self.origin_owner().await?);
        let open = self
            .host
            .list_open_proposals(&self.config.upstream_repo, &head)
            .await?;

        if let Some(existing) = open.into_iter().next() {
            let current = self
                .host
                .view_proposal(&self.config.upstream_repo, existing.number)
                .await?;
            let local = self.git.rev_parse("HEAD").await?;
            if current.head_sha != local {
                log::warn!(
                    "pull request #{} head is {}, local branch is {}",
                    current.number,
                    short(&current.head_sha),
                    short(&local)
                );
            }
            self.runtime
                .success(&format!("Pull request already open: {}", current.html_url));
            return Ok(if committed {
                ProposalOutcome::Updated(current)
            } else {
                ProposalOutcome::NoOp(Some(current))
            });
        }

        let created = self
            .host
            .create_proposal(
                &self.config.upstream_repo,
                &NewProposal {
                    title: self.title(target),
                    body: self.body(target),
                    head,
                    base: self.config.base_branch.clone(),
                },
            )
            .await?;
        self.runtime
            .success(&format!("Opened pull request #{}: {}", created.number, created.html_url));
        Ok(ProposalOutcome::Created(created))
    }

    /// Set a commit identity only where git has none
    async fn ensure_identity(&self) -> Result<(), ProposalError> {
        let identity = &self.config.identity;
        for (key, fallback) in [("user.name", &identity.name), ("user.email", &identity.email)] {
            if self.git.config_get(key).await?.is_none() {
                self.runtime
                    .verbose_println(&format!("git {key} not set, using {fallback}"));
                self.git.config_set(key, fallback).await?;
            }
        }
        Ok(())
    }

    /// Check out the proposal branch, carrying the patched entry along
    async fn switch_to_branch(&self, branch: &str) -> Result<(), ProposalError> {
        let entry_dir = self.git.repo_path().join(&self.config.app_id);
        let carry_err = |source| ProposalError::Carry {
            path: entry_dir.clone(),
            source,
        };
        let snapshot = EntrySnapshot::capture(&entry_dir).map_err(carry_err)?;

        match ensure(
            self.git
                .create_branch(branch, &self.config.upstream_ref())
                .await,
        )? {
            Ensured::Created => self
                .runtime
                .verbose_println(&format!("Created {branch} from {}", self.config.upstream_ref())),
            Ensured::AlreadyPresent => {
                self.runtime
                    .verbose_println(&format!("{branch} exists, checking it out"));
                self.git.checkout(branch, true).await?;
            }
        }

        snapshot.restore().map_err(carry_err)?;
        log::debug!("carried {} file(s) onto {branch}", snapshot.len());
        Ok(())
    }

    /// Owner of the `origin` remote, the head side of the pull request
    async fn origin_owner(&self) -> Result<String, ProposalError> {
        let url = self.git.remote_url("origin").await?.unwrap_or_default();
        RepoSlug::from_remote_url(&url)
            .map(|slug| slug.owner)
            .ok_or(ProposalError::UnknownOrigin { url })
    }
}

fn short(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}
