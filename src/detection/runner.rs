//! Bounded external command execution.

use super::path_finder::find_executable;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Outcome of a single command invocation.
///
/// Produced exactly once per invocation. Every failure mode (binary not
/// found, non-zero exit, timeout, malformed shell syntax) is folded into
/// `success: false` with whatever diagnostics were available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Captured standard output, trimmed.
    pub stdout: String,
    /// Captured standard error, trimmed. Holds the spawn or timeout
    /// message when the command never produced output.
    pub stderr: String,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
}

impl CommandOutcome {
    /// Build an outcome from a finished process.
    pub fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        }
    }

    /// Build a failed outcome carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: message.into(),
            exit_code: None,
        }
    }

    /// Build a successful outcome with the given stdout. Mostly useful for
    /// scripted runners in tests.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// The text a version probe should parse: stdout, or stderr when stdout
    /// is empty (some tools print their version to stderr).
    pub fn version_text(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

/// Executes external commands on behalf of probes and domain loaders.
///
/// Implementations must never panic or return early without an outcome;
/// a failed invocation is reported through [`CommandOutcome::success`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a shell command line with a hard timeout.
    async fn run(&self, command_line: &str, timeout: Duration) -> CommandOutcome;

    /// Resolve a command name to an absolute path, `None` when unresolved.
    async fn tool_path(&self, command: &str) -> Option<PathBuf>;
}

/// [`CommandRunner`] backed by the host shell (`sh -c` / `cmd /C`).
///
/// Children are spawned with `kill_on_drop`, so a timed-out command is
/// killed when its future is dropped. No retries are attempted.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a runner for the host shell.
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command_line: &str) -> Command {
        #[cfg(windows)]
        let mut command = {
            let mut c = Command::new("cmd");
            c.args(["/C", command_line]);
            c
        };
        #[cfg(not(windows))]
        let mut command = {
            let mut c = Command::new("sh");
            c.args(["-c", command_line]);
            c
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command_line: &str, limit: Duration) -> CommandOutcome {
        if command_line.trim().is_empty() {
            return CommandOutcome::failure("empty command line");
        }

        let outcome = match timeout(limit, Self::shell_command(command_line).output()).await {
            Ok(Ok(output)) => CommandOutcome::from_output(output),
            Ok(Err(e)) => CommandOutcome::failure(e.to_string()),
            Err(_) => CommandOutcome::failure(format!("timed out after {limit:?}")),
        };

        debug!(
            command = command_line,
            success = outcome.success,
            exit_code = ?outcome.exit_code,
            "command finished"
        );
        outcome
    }

    async fn tool_path(&self, command: &str) -> Option<PathBuf> {
        let command = command.to_string();
        tokio::task::spawn_blocking(move || find_executable(&command))
            .await
            .ok()
            .flatten()
    }
}

/// Whether `token` can be placed in a shell command line verbatim.
///
/// Accepts ASCII alphanumerics, `.`, `_`, `-`, `+` and any of `extra`.
/// Empty tokens and tokens starting with `-` are rejected.
pub(crate) fn is_shell_safe(token: &str, extra: &[char]) -> bool {
    !token.is_empty()
        && !token.starts_with('-')
        && token.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+') || extra.contains(&c)
        })
}
