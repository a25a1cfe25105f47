//! Orchestration of a synchronization run.
//!
//! Stages run strictly in order: resolve, artifact, sync, patch, verify,
//! propose. The first fatal error stops the run; it is recorded in the
//! [`RunSummary`] under its stage and returned. Dry-run is passed to every
//! stage so each one decides what "no external mutation" means for it.

mod summary;

pub use summary::{RunSummary, StageRecord, StepOutcome};

use crate::artifact::{ArtifactBuilder, ArtifactLocator};
use crate::cli::RuntimeConfig;
use crate::descriptor::{DescriptorPatcher, PatchReport};
use crate::error::{ConfigurationError, PipelineError, Result, Stage};
use crate::git::{RepositorySync, SourceControl};
use crate::github::CodeHost;
use crate::lint::Linter;
use crate::proposal::{ChangeProposer, ProposalOutcome};
use crate::version::VersionResolver;
use crate::{ReleaseTarget, SyncConfig};
use chrono::NaiveDate;

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Version and digest the catalog now points at
    pub target: ReleaseTarget,
    /// Descriptor changes
    pub patch: PatchReport,
    /// Proposal result; `None` when proposals were disabled or in a dry run
    pub proposal: Option<ProposalOutcome>,
}

/// The release synchronization pipeline
pub struct Pipeline<'a, G, H, B, L>
where
    G: SourceControl,
    H: CodeHost,
    B: ArtifactBuilder,
    L: Linter,
{
    config: &'a SyncConfig,
    runtime: &'a RuntimeConfig,
    git: &'a G,
    host: &'a H,
    builder: &'a B,
    linter: &'a L,
    today: NaiveDate,
}

impl<'a, G, H, B, L> Pipeline<'a, G, H, B, L>
where
    G: SourceControl,
    H: CodeHost,
    B: ArtifactBuilder,
    L: Linter,
{
    /// Wire the pipeline to its collaborators
    pub fn new(
        config: &'a SyncConfig,
        runtime: &'a RuntimeConfig,
        git: &'a G,
        host: &'a H,
        builder: &'a B,
        linter: &'a L,
    ) -> Self {
        Self {
            config,
            runtime,
            git,
            host,
            builder,
            linter,
            today: chrono::Utc::now().date_naive(),
        }
    }

    /// Use `date` in release notes instead of today
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.today = date;
        self
    }

    /// Run every stage, recording outcomes in `summary`
    pub async fn run(&self, summary: &mut RunSummary) -> Result<RunOutcome> {
        let config = self.config;
        let dry_run = config.dry_run;
        if dry_run {
            self.runtime
                .warn("Dry run: no external changes will be made");
        }

        record(summary, Stage::Configuration, self.check_config(), |_| {
            "valid".to_string()
        })?;

        self.runtime.section("Version");
        let resolver = VersionResolver::new(self.host, config.release_repo.as_ref());
        let version = record(
            summary,
            Stage::Resolve,
            resolver.resolve(config.version.as_deref()).await,
            String::clone,
        )?;
        self.runtime.success(&format!("Version {version}"));

        self.runtime.section("Artifact");
        let locator = ArtifactLocator::new(self.builder, &config.image, &config.platforms, self.runtime);
        let digest = record(
            summary,
            Stage::Artifact,
            locator
                .locate(&version, config.skip_build, config.digest.as_deref(), dry_run)
                .await,
            |d| d.to_string(),
        )?;
        let target = ReleaseTarget::new(version, digest);

        self.runtime.section("Repository");
        let sync = RepositorySync::new(self.git, self.host, config, self.runtime);
        let synced = record(
            summary,
            Stage::Sync,
            sync.sync().await.map_err(PipelineError::from),
            |r| format!("{} at {}", r.repo_path.display(), r.head.get(..12).unwrap_or(&r.head)),
        )?;

        self.runtime.section("Descriptors");
        let patcher = DescriptorPatcher::new(&config.app_id, &config.image, &config.template_dir, self.runtime);
        let patch = record(
            summary,
            Stage::Patch,
            patcher
                .patch(&synced.repo_path, &target, self.today, dry_run)
                .map_err(PipelineError::from),
            |p| {
                let changed = p.files.iter().filter(|f| f.is_changed()).count();
                match (p.seeded.is_empty(), changed) {
                    (true, 0) => "already up to date".to_string(),
                    (true, n) => format!("{n} file(s) changed"),
                    (false, n) => format!("seeded, {n} file(s) changed"),
                }
            },
        )?;

        if config.skip_verify {
            summary.record(Stage::Verify, StepOutcome::Skipped, "--skip-verify");
        } else if dry_run {
            summary.record(Stage::Verify, StepOutcome::Skipped, "dry run");
        } else {
            self.runtime.section("Verify");
            record(
                summary,
                Stage::Verify,
                self.linter.lint(&config.app_id).await.map_err(PipelineError::from),
                |_| "lint passed".to_string(),
            )?;
        }

        if !config.create_proposal {
            summary.record(Stage::Propose, StepOutcome::Skipped, "--create-proposal not set");
            return Ok(RunOutcome {
                target,
                patch,
                proposal: None,
            });
        }

        self.runtime.section("Proposal");
        let proposer = ChangeProposer::new(self.git, self.host, config, self.runtime);
        let outcome = proposer
            .propose(&target, dry_run)
            .await
            .map_err(PipelineError::from);

        if dry_run {
            match outcome {
                Ok(_) => summary.record(Stage::Propose, StepOutcome::Skipped, "dry run (reported only)"),
                Err(e) => {
                    summary.record(Stage::Propose, StepOutcome::FatalFailure, e.to_string());
                    return Err(e);
                }
            }
            return Ok(RunOutcome {
                target,
                patch,
                proposal: None,
            });
        }

        let outcome = record(summary, Stage::Propose, outcome, describe_proposal)?;
        Ok(RunOutcome {
            target,
            patch,
            proposal: Some(outcome),
        })
    }

    /// Checks that hold for any caller, not just the command line
    fn check_config(&self) -> Result<()> {
        let config = self.config;
        if config.skip_build && config.digest.is_none() {
            return Err(ConfigurationError::MissingRequirement {
                flag: "skip-build".to_string(),
                required: "digest".to_string(),
            }
            .into());
        }
        if config.app_id.is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: "app id".to_string(),
                reason: "empty".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Record the outcome of `result` for `stage` and pass it through
fn record<T>(
    summary: &mut RunSummary,
    stage: Stage,
    result: Result<T>,
    detail: impl FnOnce(&T) -> String,
) -> Result<T> {
    match &result {
        Ok(value) => summary.record(stage, StepOutcome::Success, detail(value)),
        Err(e) => summary.record(stage, StepOutcome::FatalFailure, e.to_string()),
    }
    result
}

fn describe_proposal(outcome: &ProposalOutcome) -> String {
    match outcome {
        ProposalOutcome::Created(p) => format!("opened #{} {}", p.number, p.html_url),
        ProposalOutcome::Updated(p) => format!("updated #{} {}", p.number, p.html_url),
        ProposalOutcome::NoOp(Some(p)) => format!("no changes, #{} open", p.number),
        ProposalOutcome::NoOp(None) => "no changes".to_string(),
    }
}
