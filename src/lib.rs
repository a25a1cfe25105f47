//! # Catalog Release Sync
//!
//! Idempotent release synchronization for app-store style catalogs.
//!
//! Given a published version, this crate publishes (or locates) the
//! container image, reconciles a local working copy of a fork of the
//! catalog repository, patches the app's descriptors, and makes sure
//! exactly one pull request carries the update. Re-running for the same
//! version converges on the same branch and the same pull request.
//!
//! ## Pipeline
//!
//! 1. [`version::VersionResolver`] - explicit version or latest release tag
//! 2. [`artifact::ArtifactLocator`] - build + publish, or supplied digest
//! 3. [`git::RepositorySync`] - hard-reset the working copy to upstream
//! 4. [`descriptor::DescriptorPatcher`] - rewrite image/version/notes lines
//! 5. [`lint::Linter`] - optional external verification
//! 6. [`proposal::ChangeProposer`] - commit, push, one pull request
//!
//! ## Usage
//!
//! ```bash
//! catalog_release_sync --app-id myapp --image ghcr.io/me/myapp \
//!     --repository getumbrel/umbrel-apps --release-repo me/myapp
//! catalog_release_sync ... --version v1.2.3 --skip-build --digest sha256:abcd...
//! catalog_release_sync ... --dry-run
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod artifact;
pub mod cli;
pub mod descriptor;
pub mod error;
pub mod git;
pub mod github;
pub mod lint;
pub mod pipeline;
pub mod process;
pub mod proposal;
pub mod repo;
pub mod timeouts;
pub mod version;

pub use artifact::{ArtifactBuilder, ArtifactLocator, ContentDigest};
pub use cli::Args;
pub use descriptor::{DescriptorPatcher, PatchReport};
pub use error::{PipelineError, Result, Stage};
pub use git::{GitCli, RepositorySync, SourceControl};
pub use github::{CodeHost, GitHubClient};
pub use lint::{CommandLinter, Linter};
pub use pipeline::{Pipeline, RunSummary, StepOutcome};
pub use proposal::{ChangeProposer, ProposalOutcome};
pub use repo::RepoSlug;
pub use timeouts::TimeoutConfig;
pub use version::VersionResolver;

use std::collections::HashMap;
use std::path::PathBuf;

/// Snapshot of the process environment.
///
/// Read once at startup and passed explicitly, so components never consult
/// ambient global state.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    vars: HashMap<String, String>,
}

impl EnvConfig {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a non-empty variable
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).filter(|v| !v.is_empty()).cloned()
    }

    /// GitHub token from `GH_TOKEN` or `GITHUB_TOKEN`
    pub fn github_token(&self) -> Option<String> {
        self.get("GH_TOKEN").or_else(|| self.get("GITHUB_TOKEN"))
    }
}

/// A version paired with the content digest of its published image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    /// Release tag, optionally `v`-prefixed
    pub version: String,
    /// Content digest of the image published for `version`
    pub digest: ContentDigest,
}

impl ReleaseTarget {
    /// Create a release target
    pub fn new(version: impl Into<String>, digest: ContentDigest) -> Self {
        Self {
            version: version.into(),
            digest,
        }
    }

    /// Version without a leading `v`
    pub fn version_number(&self) -> &str {
        self.version
            .strip_prefix('v')
            .or_else(|| self.version.strip_prefix('V'))
            .unwrap_or(&self.version)
    }

    /// Full image reference pinned by tag and digest
    pub fn image_ref(&self, image: &str) -> String {
        format!("{}:{}@{}", image, self.version, self.digest)
    }
}

/// Fallback commit identity, used only when git has none configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
    /// `user.name`
    pub name: String,
    /// `user.email`
    pub email: String,
}

impl Default for GitIdentity {
    fn default() -> Self {
        Self {
            name: "catalog-release-sync".to_string(),
            email: "catalog-release-sync@users.noreply.github.com".to_string(),
        }
    }
}

/// Configuration for one synchronization run.
///
/// Built once from command line arguments and environment, then passed by
/// reference to every component.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// App id inside the catalog (directory name, branch component)
    pub app_id: String,
    /// Image name without tag, e.g. `ghcr.io/me/myapp`
    pub image: String,
    /// Canonical catalog repository
    pub upstream_repo: RepoSlug,
    /// Explicit fork to clone as `origin`; discovered when unset
    pub fork_repo: Option<RepoSlug>,
    /// Project whose latest release provides the version
    pub release_repo: Option<RepoSlug>,
    /// Primary branch of the catalog
    pub base_branch: String,
    /// Directory holding the working copy
    pub work_dir: PathBuf,
    /// Directory copied into the catalog when the app is new
    pub template_dir: PathBuf,
    /// Docker build context
    pub build_context: PathBuf,
    /// Dockerfile, relative to the build context when not absolute
    pub dockerfile: Option<PathBuf>,
    /// Target build platforms
    pub platforms: Vec<String>,
    /// Explicit version override
    pub version: Option<String>,
    /// Explicit digest override
    pub digest: Option<String>,
    /// Lint program followed by its arguments; the app id is appended
    pub lint_command: Vec<String>,
    /// Do not build; requires `digest`
    pub skip_build: bool,
    /// Do not run the lint step
    pub skip_verify: bool,
    /// Commit, push and open a pull request
    pub create_proposal: bool,
    /// Report intended actions without mutating anything external
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
    /// Identity used when git has none configured
    pub identity: GitIdentity,
    /// Deadlines for external calls
    pub timeouts: TimeoutConfig,
    /// Base URL repositories are cloned from
    pub git_base: String,
}

impl SyncConfig {
    /// Minimal configuration with defaults for everything optional
    pub fn new(app_id: impl Into<String>, image: impl Into<String>, upstream_repo: RepoSlug) -> Self {
        Self {
            app_id: app_id.into(),
            image: image.into(),
            upstream_repo,
            fork_repo: None,
            release_repo: None,
            base_branch: "main".to_string(),
            work_dir: PathBuf::from("."),
            template_dir: PathBuf::from("umbrel-app"),
            build_context: PathBuf::from("."),
            dockerfile: None,
            platforms: vec!["linux/amd64".to_string(), "linux/arm64".to_string()],
            version: None,
            digest: None,
            lint_command: vec!["npm".to_string(), "run".to_string(), "lint".to_string(), "--".to_string()],
            skip_build: false,
            skip_verify: false,
            create_proposal: false,
            dry_run: false,
            verbose: false,
            identity: GitIdentity::default(),
            timeouts: TimeoutConfig::default(),
            git_base: repo::DEFAULT_GIT_BASE.to_string(),
        }
    }

    /// Local working copy location
    pub fn repo_dir(&self) -> PathBuf {
        self.work_dir.join(&self.upstream_repo.name)
    }

    /// Upstream reference that the base branch is reset to
    pub fn upstream_ref(&self) -> String {
        format!("upstream/{}", self.base_branch)
    }

    /// Deterministic proposal branch for a version
    pub fn branch_name(&self, version: &str) -> String {
        format!("update-{}-{}", self.app_id, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest() -> ContentDigest {
        "sha256:deadbeef".parse().unwrap()
    }

    #[test]
    fn test_version_number_strips_prefix() {
        assert_eq!(ReleaseTarget::new("v2026.1.24", digest()).version_number(), "2026.1.24");
        assert_eq!(ReleaseTarget::new("2026.1.24", digest()).version_number(), "2026.1.24");
    }

    #[test]
    fn test_image_ref() {
        let target = ReleaseTarget::new("v1.2.3", digest());
        assert_eq!(
            target.image_ref("ghcr.io/x/y"),
            "ghcr.io/x/y:v1.2.3@sha256:deadbeef"
        );
    }

    #[test]
    fn test_branch_and_paths() {
        let mut config = SyncConfig::new("myapp", "ghcr.io/x/y", RepoSlug::new("getumbrel", "umbrel-apps"));
        config.work_dir = PathBuf::from("/tmp/work");
        assert_eq!(config.branch_name("v1.0.0"), "update-myapp-v1.0.0");
        assert_eq!(config.repo_dir(), PathBuf::from("/tmp/work/umbrel-apps"));
        assert_eq!(config.upstream_ref(), "upstream/main");
    }

    #[test]
    fn test_env_token_precedence() {
        let env = EnvConfig::from_pairs([("GITHUB_TOKEN", "b"), ("GH_TOKEN", "a")]);
        assert_eq!(env.github_token().as_deref(), Some("a"));
        let env = EnvConfig::from_pairs([("GH_TOKEN", ""), ("GITHUB_TOKEN", "b")]);
        assert_eq!(env.github_token().as_deref(), Some("b"));
    }
}
