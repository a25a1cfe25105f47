//! [`SourceControl`] backed by the `git` executable.
//!
//! Git is run with `LC_ALL=C` so the few stderr messages we classify
//! ("already exists", push rejections) are stable across locales, and with
//! terminal prompts disabled so a missing credential fails instead of
//! hanging.

use super::{CommitOutcome, PushMode, SourceControl};
use crate::error::GitError;
use crate::process::{self, CommandOutput};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Git operations through the command line
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
    timeout: Duration,
}

impl GitCli {
    /// Operate on the working copy at `repo_path`
    pub fn new(repo_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            repo_path: repo_path.into(),
            timeout,
        }
    }

    fn command(&self, dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(dir)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0");
        cmd
    }

    /// Run git in the working copy, returning the output whatever the exit code
    async fn output(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        let cmd = self.command(&self.repo_path, args);
        Ok(process::run(cmd, self.timeout).await?)
    }

    /// Run git in the working copy, failing on a non-zero exit
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        let output = self.output(args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(failed(args, &output))
        }
    }
}

fn failed(args: &[&str], output: &CommandOutput) -> GitError {
    GitError::Failed {
        operation: args.first().copied().unwrap_or_default().to_string(),
        code: output.code,
        stderr: output.stderr_trimmed().to_string(),
    }
}

fn already_exists(output: &CommandOutput) -> bool {
    output.stderr.contains("already exists")
}

fn push_rejected(output: &CommandOutput) -> bool {
    let stderr = &output.stderr;
    stderr.contains("[rejected]")
        || stderr.contains("stale info")
        || stderr.contains("failed to push some refs")
}

impl SourceControl for GitCli {
    fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    async fn clone_from(&self, url: &str) -> Result<(), GitError> {
        let parent = self
            .repo_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let target = self
            .repo_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| self.repo_path.to_string_lossy());
        let args = ["clone", "--origin", "origin", url, &*target];
        let output = process::run(self.command(parent, &args), self.timeout).await?;
        if output.success() {
            Ok(())
        } else if already_exists(&output) {
            Err(GitError::AlreadyExists {
                operation: "clone".to_string(),
                name: target.to_string(),
            })
        } else {
            Err(failed(&args, &output))
        }
    }

    async fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        let output = self.output(&["remote", "get-url", name]).await?;
        if output.success() {
            Ok(Some(output.stdout_trimmed().to_string()))
        } else if output.stderr.contains("No such remote") {
            Ok(None)
        } else {
            Err(failed(&["remote"], &output))
        }
    }

    async fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        let output = self.output(&["remote", "add", name, url]).await?;
        if output.success() {
            Ok(())
        } else if already_exists(&output) {
            Err(GitError::AlreadyExists {
                operation: "remote add".to_string(),
                name: name.to_string(),
            })
        } else {
            Err(failed(&["remote"], &output))
        }
    }

    async fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.run(&["fetch", "--prune", remote]).await.map(|_| ())
    }

    async fn checkout(&self, reference: &str, force: bool) -> Result<(), GitError> {
        let mut args = vec!["checkout"];
        if force {
            args.push("--force");
        }
        args.push(reference);
        self.run(&args).await.map(|_| ())
    }

    async fn create_branch(&self, name: &str, start: &str) -> Result<(), GitError> {
        let output = self
            .output(&["checkout", "--force", "--no-track", "-b", name, start])
            .await?;
        if output.success() {
            Ok(())
        } else if already_exists(&output) {
            Err(GitError::AlreadyExists {
                operation: "checkout -b".to_string(),
                name: name.to_string(),
            })
        } else {
            Err(failed(&["checkout"], &output))
        }
    }

    async fn reset_hard(&self, reference: &str) -> Result<(), GitError> {
        self.run(&["reset", "--hard", reference]).await?;
        self.run(&["clean", "-fd"]).await.map(|_| ())
    }

    async fn config_get(&self, key: &str) -> Result<Option<String>, GitError> {
        let output = self.output(&["config", "--get", key]).await?;
        match output.code {
            0 => Ok(Some(output.stdout_trimmed().to_string()).filter(|v| !v.is_empty())),
            // exit 1: key not set
            1 => Ok(None),
            _ => Err(failed(&["config"], &output)),
        }
    }

    async fn config_set(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run(&["config", "--local", key, value]).await.map(|_| ())
    }

    async fn add(&self, path: &str) -> Result<(), GitError> {
        self.run(&["add", "--all", "--", path]).await.map(|_| ())
    }

    async fn commit(&self, message: &str) -> Result<CommitOutcome, GitError> {
        // exit 0: index matches HEAD
        let staged = self.output(&["diff", "--cached", "--quiet"]).await?;
        match staged.code {
            0 => return Ok(CommitOutcome::NothingToCommit),
            1 => {}
            _ => return Err(failed(&["diff"], &staged)),
        }

        self.run(&["commit", "--no-verify", "-m", message]).await?;
        let sha = self.rev_parse("HEAD").await?;
        Ok(CommitOutcome::Committed { sha })
    }

    async fn push(&self, remote: &str, branch: &str, mode: PushMode) -> Result<(), GitError> {
        let output = self
            .output(&["push", mode.flag(), "--set-upstream", remote, branch])
            .await?;
        if output.success() {
            Ok(())
        } else if push_rejected(&output) {
            Err(GitError::PushRejected {
                branch: branch.to_string(),
                stderr: output.stderr_trimmed().to_string(),
            })
        } else {
            Err(failed(&["push"], &output))
        }
    }

    async fn rev_parse(&self, reference: &str) -> Result<String, GitError> {
        let output = self.run(&["rev-parse", "--verify", reference]).await?;
        Ok(output.stdout_trimmed().to_string())
    }
}
