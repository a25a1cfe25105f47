//! External verification of a patched catalog entry.

use crate::cli::RuntimeConfig;
use crate::error::VerifyError;
use crate::process;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Lint collaborator: an opaque pass/fail check of one entry
pub trait Linter {
    /// Check the entry `app_id`; a non-zero exit is [`VerifyError::LintFailed`]
    fn lint(&self, app_id: &str) -> impl Future<Output = Result<(), VerifyError>>;
}

/// Runs a configured command in the working copy with the app id appended
#[derive(Debug, Clone)]
pub struct CommandLinter {
    program: String,
    args: Vec<String>,
    repo_path: PathBuf,
    timeout: Duration,
    runtime: RuntimeConfig,
}

impl CommandLinter {
    /// Create a linter from `command` (program followed by its arguments).
    ///
    /// Returns `None` for an empty command.
    pub fn new(
        command: &[String],
        repo_path: PathBuf,
        timeout: Duration,
        runtime: RuntimeConfig,
    ) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            repo_path,
            timeout,
            runtime,
        })
    }

    fn command(&self, app_id: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(app_id).current_dir(&self.repo_path);
        cmd
    }
}

impl Linter for CommandLinter {
    async fn lint(&self, app_id: &str) -> Result<(), VerifyError> {
        let cmd = self.command(app_id);
        self.runtime
            .progress(&format!("Linting {app_id}: {}", process::describe(&cmd)));

        let runtime = &self.runtime;
        let output = process::stream(cmd, self.timeout, |line| runtime.verbose_indent(line)).await?;

        if !output.success() {
            for line in output.stdout.lines().chain(output.stderr.lines()) {
                runtime.indent(line);
            }
            return Err(VerifyError::LintFailed {
                entry: app_id.to_string(),
                code: output.code,
            });
        }

        self.runtime.success(&format!("Lint passed for {app_id}"));
        Ok(())
    }
}

/// No configured command: every entry passes
impl<L: Linter> Linter for Option<L> {
    async fn lint(&self, app_id: &str) -> Result<(), VerifyError> {
        match self {
            Some(linter) => linter.lint(app_id).await,
            None => {
                log::debug!("no lint command configured, not linting {app_id}");
                Ok(())
            }
        }
    }
}
