//! External process execution with deadlines.
//!
//! Every collaborator that shells out (git, docker, the lint tool) goes
//! through [`run`] or [`stream`]. A non-zero exit is not an error at this
//! layer; callers classify the output. Only failures to run the process to
//! completion (spawn, wait, deadline) surface as [`CommandError`].

use crate::error::CommandError;
use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Number of trailing stderr lines kept by [`stream`]
const STREAM_TAIL_LINES: usize = 20;

/// Captured result of a finished process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, -1 when terminated by a signal
    pub code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited with status zero
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Standard output with surrounding whitespace removed
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Standard error with surrounding whitespace removed
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Render a command line for logs and error messages
pub fn describe(command: &Command) -> String {
    let std_cmd = command.as_std();
    let mut line = std_cmd.get_program().to_string_lossy().into_owned();
    for arg in std_cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Run a command to completion, capturing stdout and stderr.
///
/// The child is killed if `timeout` elapses first.
pub async fn run(mut command: Command, timeout: Duration) -> Result<CommandOutput, CommandError> {
    let line = describe(&command);
    log::debug!("exec: {line}");

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|source| CommandError::Spawn {
        command: line.clone(),
        source,
    })?;

    // Dropping the future on timeout drops the child, and kill_on_drop reaps it
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => return Err(CommandError::Wait { command: line, source }),
        Err(_elapsed) => {
            log::warn!("'{line}' exceeded {}s, killed", timeout.as_secs());
            return Err(CommandError::TimedOut {
                command: line,
                timeout,
            });
        }
    };

    let result = CommandOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    log::debug!("exit {}: {line}", result.code);
    Ok(result)
}

/// Run a long command, forwarding each stderr line to `on_line` as it
/// arrives.
///
/// Used for builds, whose progress is written to stderr. The returned
/// output holds all of stdout and the last few stderr lines.
pub async fn stream<F>(
    mut command: Command,
    timeout: Duration,
    mut on_line: F,
) -> Result<CommandOutput, CommandError>
where
    F: FnMut(&str),
{
    let line = describe(&command);
    log::debug!("exec (streaming): {line}");

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| CommandError::Spawn {
        command: line.clone(),
        source,
    })?;

    let stdout_task = child.stdout.take().map(|mut stdout| {
        tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf).await;
            buf
        })
    });
    let stderr = child.stderr.take();

    let mut tail: VecDeque<String> = VecDeque::with_capacity(STREAM_TAIL_LINES);
    let waited = tokio::time::timeout(timeout, async {
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(text)) = lines.next_line().await {
                on_line(&text);
                if tail.len() == STREAM_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(text);
            }
        }
        child.wait().await
    })
    .await;

    let status = match waited {
        Ok(Ok(status)) => status,
        Ok(Err(source)) => return Err(CommandError::Wait { command: line, source }),
        Err(_elapsed) => {
            log::warn!("'{line}' exceeded {}s, terminating", timeout.as_secs());
            if let Err(e) = child.kill().await {
                log::warn!("failed to kill '{line}': {e}");
            }
            let _ = tokio::time::timeout(Duration::from_secs(10), child.wait()).await;
            return Err(CommandError::TimedOut {
                command: line,
                timeout,
            });
        }
    };

    let stdout = match stdout_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    Ok(CommandOutput {
        code: status.code().unwrap_or(-1),
        stdout,
        stderr: tail.into_iter().collect::<Vec<_>>().join("\n"),
    })
}
