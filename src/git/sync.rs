//! Working copy reconciliation.

use super::{Ensured, SourceControl, ensure};
use crate::SyncConfig;
use crate::cli::RuntimeConfig;
use crate::error::SyncError;
use crate::github::CodeHost;
use crate::repo::RepoSlug;
use std::path::PathBuf;

/// Where the `origin` remote of the working copy points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginSource {
    /// The working copy existed; its origin was left as is
    Existing,
    /// Freshly cloned from this fork
    Fork(RepoSlug),
    /// Freshly cloned from the upstream repository (no fork found)
    Upstream,
}

/// State of the working copy after a sync
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Working copy path
    pub repo_path: PathBuf,
    /// Origin of the working copy
    pub origin: OriginSource,
    /// Commit the base branch now points at (the upstream tip)
    pub head: String,
}

/// Brings the working copy's base branch to the upstream tip.
///
/// Reuses a copy on disk when present, otherwise clones the fork of the
/// upstream repository (or the upstream itself when there is no fork).
pub struct RepositorySync<'a, G: SourceControl, H: CodeHost> {
    git: &'a G,
    host: &'a H,
    config: &'a SyncConfig,
    runtime: &'a RuntimeConfig,
}

impl<'a, G: SourceControl, H: CodeHost> RepositorySync<'a, G, H> {
    /// Create a sync step
    pub fn new(git: &'a G, host: &'a H, config: &'a SyncConfig, runtime: &'a RuntimeConfig) -> Self {
        Self {
            git,
            host,
            config,
            runtime,
        }
    }

    /// Reconcile the working copy.
    ///
    /// Local modifications and untracked files on the base branch are
    /// discarded.
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let upstream_url = self
            .config
            .upstream_repo
            .clone_url_on(&self.config.git_base);

        let origin = if self.git.is_cloned() {
            self.runtime.progress(&format!(
                "Updating working copy {}",
                self.git.repo_path().display()
            ));
            self.ensure_upstream(&upstream_url).await?;
            self.git.fetch("origin").await?;
            self.git.fetch("upstream").await?;
            OriginSource::Existing
        } else {
            self.prepare_work_dir()?;
            let origin = self.resolve_origin().await?;
            let url = match &origin {
                OriginSource::Fork(fork) => fork.clone_url_on(&self.config.git_base),
                _ => upstream_url.clone(),
            };
            self.runtime.progress(&format!("Cloning {url}"));
            self.git.clone_from(&url).await?;
            self.ensure_upstream(&upstream_url).await?;
            self.git.fetch("upstream").await?;
            origin
        };

        let base = &self.config.base_branch;
        let upstream_ref = self.config.upstream_ref();
        if let Err(e) = self.git.checkout(base, true).await {
            log::debug!("checkout of {base} failed ({e}), creating it from {upstream_ref}");
            self.git.create_branch(base, &upstream_ref).await?;
        }
        self.git.reset_hard(&upstream_ref).await?;
        let head = self.git.rev_parse("HEAD").await?;

        self.runtime.success(&format!(
            "{base} reset to {upstream_ref} ({})",
            head.get(..12).unwrap_or(&head)
        ));

        Ok(SyncReport {
            repo_path: self.git.repo_path().to_path_buf(),
            origin,
            head,
        })
    }

    fn prepare_work_dir(&self) -> Result<(), SyncError> {
        let Some(parent) = self.git.repo_path().parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(parent).map_err(|source| SyncError::WorkDir {
            path: parent.to_path_buf(),
            source,
        })
    }

    async fn ensure_upstream(&self, url: &str) -> Result<(), SyncError> {
        match ensure(self.git.add_remote("upstream", url).await)? {
            Ensured::Created => self.runtime.verbose_println(&format!("Added upstream remote {url}")),
            Ensured::AlreadyPresent => {
                if let Some(existing) = self.git.remote_url("upstream").await?
                    && existing != url
                {
                    self.runtime.warn(&format!(
                        "upstream remote points at {existing}, expected {url}"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Decide what to clone as `origin`
    async fn resolve_origin(&self) -> Result<OriginSource, SyncError> {
        if let Some(fork) = &self.config.fork_repo {
            return Ok(OriginSource::Fork(fork.clone()));
        }
        if !self.host.is_authenticated() {
            self.runtime
                .verbose_println("No GitHub token, cloning the upstream repository directly");
            return Ok(OriginSource::Upstream);
        }

        let user = self.host.current_user().await?;
        match self.host.find_fork(&self.config.upstream_repo, &user).await? {
            Some(fork) => {
                self.runtime.verbose_println(&format!("Using fork {fork}"));
                Ok(OriginSource::Fork(fork))
            }
            None => {
                self.runtime.warn(&format!(
                    "{user} has no fork of {}, cloning it directly",
                    self.config.upstream_repo
                ));
                Ok(OriginSource::Upstream)
            }
        }
    }
}
