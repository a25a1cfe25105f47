//! Command line argument parsing and validation.
//!
//! Every option has a `CATALOG_SYNC_*` environment fallback so the tool can
//! run unattended from CI with the same surface as an interactive run.

use crate::error::ConfigurationError;
use crate::{ContentDigest, EnvConfig, RepoSlug, SyncConfig, TimeoutConfig};
use clap::Parser;
use clap::builder::FalseyValueParser;
use std::path::PathBuf;

/// Publish an app image and propose the matching catalog update
#[derive(Parser, Debug, Clone)]
#[command(
    name = "catalog_release_sync",
    about = "Publish an app image and propose the matching catalog update",
    long_about = "Builds and pushes a multi-platform image for a release, pins the catalog \
descriptors of the app to the published digest, and opens (or updates) exactly one pull \
request per version against the upstream catalog.

Usage:
  catalog_release_sync --app-id myapp --image ghcr.io/me/myapp \\
      --repository getumbrel/umbrel-apps --release-repo me/myapp --create-proposal
  catalog_release_sync ... --version v1.2.3 --skip-build --digest sha256:...
  catalog_release_sync ... --dry-run --verbose"
)]
pub struct Args {
    /// App id in the catalog (directory name)
    #[arg(long, env = "CATALOG_SYNC_APP_ID")]
    pub app_id: String,

    /// Image name without tag, e.g. ghcr.io/me/myapp
    #[arg(long, env = "CATALOG_SYNC_IMAGE")]
    pub image: String,

    /// Upstream catalog repository (owner/repo)
    #[arg(long, env = "CATALOG_SYNC_REPOSITORY")]
    pub repository: RepoSlug,

    /// Fork to push to (owner/repo); discovered from the token's user when omitted
    #[arg(long, env = "CATALOG_SYNC_FORK")]
    pub fork: Option<RepoSlug>,

    /// Project whose latest GitHub release supplies the version
    #[arg(long, env = "CATALOG_SYNC_RELEASE_REPO")]
    pub release_repo: Option<RepoSlug>,

    /// Primary branch of the catalog
    #[arg(long, env = "CATALOG_SYNC_BASE_BRANCH", default_value = "main")]
    pub base_branch: String,

    /// Directory holding the catalog working copy
    #[arg(long, env = "CATALOG_SYNC_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Directory copied into the catalog when the app is not there yet
    #[arg(long, env = "CATALOG_SYNC_TEMPLATE_DIR", default_value = "umbrel-app")]
    pub template_dir: PathBuf,

    /// Docker build context
    #[arg(long, env = "CATALOG_SYNC_CONTEXT", default_value = ".")]
    pub context: PathBuf,

    /// Dockerfile to build
    #[arg(long, env = "CATALOG_SYNC_DOCKERFILE")]
    pub dockerfile: Option<PathBuf>,

    /// Build platforms, comma separated
    #[arg(
        long,
        env = "CATALOG_SYNC_PLATFORMS",
        value_delimiter = ',',
        default_value = "linux/amd64,linux/arm64"
    )]
    pub platforms: Vec<String>,

    /// Release version (tag); the latest release of --release-repo when omitted
    #[arg(long, env = "CATALOG_SYNC_VERSION")]
    pub version: Option<String>,

    /// Image digest (algorithm:hex), required with --skip-build
    #[arg(long, env = "CATALOG_SYNC_DIGEST")]
    pub digest: Option<String>,

    /// Lint command run in the working copy; the app id is appended
    #[arg(long, env = "CATALOG_SYNC_LINT_COMMAND", default_value = "npm run lint --")]
    pub lint_command: String,

    /// Base URL repositories are cloned from
    #[arg(long, env = "CATALOG_SYNC_GIT_BASE", default_value = crate::repo::DEFAULT_GIT_BASE)]
    pub git_base: String,

    /// GitHub REST API base URL
    #[arg(long, env = "CATALOG_SYNC_API_BASE", default_value = crate::github::DEFAULT_API_BASE)]
    pub api_base: String,

    /// Do not build; use --digest
    #[arg(long, env = "CATALOG_SYNC_SKIP_BUILD", value_parser = FalseyValueParser::new())]
    pub skip_build: bool,

    /// Do not run the lint step
    #[arg(long, env = "CATALOG_SYNC_SKIP_VERIFY", value_parser = FalseyValueParser::new())]
    pub skip_verify: bool,

    /// Commit, push and open or update the pull request
    #[arg(long, env = "CATALOG_SYNC_CREATE_PROPOSAL", value_parser = FalseyValueParser::new())]
    pub create_proposal: bool,

    /// Show what would happen without pushing, publishing, committing or writing files
    #[arg(long, env = "CATALOG_SYNC_DRY_RUN", value_parser = FalseyValueParser::new())]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long, env = "CATALOG_SYNC_VERBOSE", value_parser = FalseyValueParser::new())]
    pub verbose: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency.
    ///
    /// Runs before any repository or network action.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let app_id = self.app_id.trim();
        if app_id.is_empty() || app_id.contains(['/', '\\']) || app_id.starts_with('.') {
            return Err(ConfigurationError::InvalidValue {
                field: "--app-id".to_string(),
                reason: format!("'{}' is not a valid directory name", self.app_id),
            });
        }

        if self.image.trim().is_empty() || self.image.contains('@') {
            return Err(ConfigurationError::InvalidValue {
                field: "--image".to_string(),
                reason: "expected an image name without digest, e.g. ghcr.io/me/myapp".to_string(),
            });
        }

        if self.skip_build && self.digest.is_none() {
            return Err(ConfigurationError::MissingRequirement {
                flag: "skip-build".to_string(),
                required: "digest".to_string(),
            });
        }

        if let Some(digest) = &self.digest {
            ContentDigest::parse(digest).map_err(|e| ConfigurationError::InvalidValue {
                field: "--digest".to_string(),
                reason: e.to_string(),
            })?;
        }

        if self.version.as_deref().is_none_or(|v| v.trim().is_empty()) && self.release_repo.is_none() {
            return Err(ConfigurationError::InvalidValue {
                field: "--version".to_string(),
                reason: "pass --version or --release-repo to look up the latest release".to_string(),
            });
        }

        if self.platforms.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigurationError::InvalidValue {
                field: "--platforms".to_string(),
                reason: "at least one platform is required".to_string(),
            });
        }

        if self.lint_command.split_whitespace().next().is_none() && !self.skip_verify {
            return Err(ConfigurationError::InvalidValue {
                field: "--lint-command".to_string(),
                reason: "empty command".to_string(),
            });
        }

        Ok(())
    }

    /// Build the run configuration
    pub fn to_config(&self, env: &EnvConfig) -> SyncConfig {
        let mut config = SyncConfig::new(self.app_id.trim(), self.image.trim(), self.repository.clone());
        config.fork_repo = self.fork.clone();
        config.release_repo = self.release_repo.clone();
        config.base_branch = self.base_branch.clone();
        config.work_dir = self.work_dir.clone().unwrap_or_else(default_work_dir);
        config.template_dir = self.template_dir.clone();
        config.build_context = self.context.clone();
        config.dockerfile = self.dockerfile.clone();
        config.platforms = self
            .platforms
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        config.version = self
            .version
            .as_ref()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        config.digest = self.digest.clone();
        config.lint_command = self
            .lint_command
            .split_whitespace()
            .map(str::to_string)
            .collect();
        config.skip_build = self.skip_build;
        config.skip_verify = self.skip_verify;
        config.create_proposal = self.create_proposal;
        config.dry_run = self.dry_run;
        config.verbose = self.verbose;
        config.timeouts = TimeoutConfig::from_env(env);
        config.git_base = self.git_base.trim_end_matches('/').to_string();
        config
    }
}

/// Default location of the working copy: the user cache directory
fn default_work_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("catalog-release-sync")
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, false),
        }
    }

    /// Runtime configuration that prints nothing but errors
    pub fn quiet() -> Self {
        Self {
            output: super::OutputManager::new(false, true),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print message only in verbose mode
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print indented text only in verbose mode
    pub fn verbose_indent(&self, message: &str) {
        if self.output.is_verbose() {
            let _ = self.output.indent(message);
        }
    }

    /// Print progress message
    pub fn progress(&self, message: &str) {
        let _ = self.output.progress(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warn(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }
}
