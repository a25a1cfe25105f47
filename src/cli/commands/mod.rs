//! Command execution: validate, wire the real collaborators, run the
//! pipeline and turn its outcome into an exit code.

use crate::artifact::DockerBuildx;
use crate::cli::{Args, RuntimeConfig};
use crate::error::{ConfigurationError, PipelineError, Result};
use crate::git::GitCli;
use crate::github::GitHubClient;
use crate::lint::CommandLinter;
use crate::pipeline::{Pipeline, RunSummary};
use crate::{EnvConfig, SyncConfig};

/// Execute a synchronization run for the parsed arguments
pub async fn execute(args: Args, env: &EnvConfig) -> Result<i32> {
    let runtime = RuntimeConfig::new(args.verbose);

    if let Err(e) = args.validate() {
        report_failure(&runtime, &PipelineError::from(e));
        return Ok(1);
    }

    let config = args.to_config(env);
    let token = env.github_token();
    if let Err(e) = preflight(&config, token.is_some()) {
        report_failure(&runtime, &e);
        return Ok(1);
    }
    log::debug!("run configuration: {config:?}");

    let git = GitCli::new(config.repo_dir(), config.timeouts.git);
    let host = match GitHubClient::new(&args.api_base, token, config.timeouts.http) {
        Ok(host) => host,
        Err(e) => {
            runtime.error_println(&format!("Cannot create GitHub client: {e}"));
            return Ok(1);
        }
    };
    let builder = DockerBuildx::new(
        config.build_context.clone(),
        config.dockerfile.clone(),
        config.timeouts.build,
        config.timeouts.inspect,
        runtime.clone(),
    );
    let linter = CommandLinter::new(
        &config.lint_command,
        config.repo_dir(),
        config.timeouts.lint,
        runtime.clone(),
    );

    let pipeline = Pipeline::new(&config, &runtime, &git, &host, &builder, &linter);
    let mut summary = RunSummary::new();
    let result = pipeline.run(&mut summary).await;
    summary.print(&runtime);

    match result {
        Ok(outcome) => {
            match outcome.proposal.as_ref().and_then(|p| p.proposal()) {
                Some(proposal) => runtime.success(&format!(
                    "{} {} synchronized: {}",
                    config.app_id, outcome.target.version, proposal.html_url
                )),
                None => runtime.success(&format!(
                    "{} {} synchronized",
                    config.app_id, outcome.target.version
                )),
            }
            Ok(0)
        }
        Err(e) => {
            report_failure(&runtime, &e);
            Ok(1)
        }
    }
}

/// Checks that need the environment rather than the arguments alone
fn preflight(config: &SyncConfig, has_token: bool) -> Result<()> {
    if config.create_proposal && !config.dry_run && !has_token {
        return Err(ConfigurationError::MissingToken.into());
    }

    require_tool("git", "repository sync")?;
    if !config.skip_build && !config.dry_run {
        require_tool("docker", "image build and publish")?;
    }
    if !config.skip_verify
        && !config.dry_run
        && let Some(program) = config.lint_command.first()
    {
        require_tool(program, "entry lint")?;
    }
    Ok(())
}

fn require_tool(tool: &str, purpose: &str) -> Result<()> {
    which::which(tool).map_err(|_| ConfigurationError::MissingTool {
        tool: tool.to_string(),
        purpose: purpose.to_string(),
    })?;
    Ok(())
}

fn report_failure(runtime: &RuntimeConfig, error: &PipelineError) {
    runtime.error_println(&format!("Stage '{}' failed: {error}", error.stage()));
    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() {
        runtime.println("\nRecovery suggestions:");
        for suggestion in suggestions {
            runtime.println(&format!("  • {suggestion}"));
        }
    }
}
