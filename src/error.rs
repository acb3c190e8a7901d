//! Error types for domain loads.
//!
//! Probe failures never show up here: they are folded into degraded
//! [`crate::ToolRecord`]s. An [`InventoryError`] means a whole domain fetch
//! failed and ends up as that domain's `error` string in the store.

use crate::detection::CommandOutcome;
use thiserror::Error;

/// A failed domain fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InventoryError {
    /// A listing command did not succeed.
    #[error("`{command}` failed: {message}")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Best-effort diagnostic (stderr or spawn/timeout message).
        message: String,
    },

    /// A listing command succeeded but its output could not be understood.
    #[error("unexpected output from `{command}`: {message}")]
    InvalidOutput {
        /// The command line that was run.
        command: String,
        /// What went wrong while parsing.
        message: String,
    },

    /// The fetch itself failed outside of any command (e.g. a source
    /// implementation error).
    #[error("{0}")]
    Source(String),
}

impl InventoryError {
    /// Build a [`InventoryError::CommandFailed`] from an unsuccessful outcome.
    pub fn command_failed(command: impl Into<String>, outcome: &CommandOutcome) -> Self {
        let message = if outcome.stderr.is_empty() {
            match outcome.exit_code {
                Some(code) => format!("exited with code {code}"),
                None => "no output".to_string(),
            }
        } else {
            outcome.stderr.clone()
        };
        Self::CommandFailed {
            command: command.into(),
            exit_code: outcome.exit_code,
            message,
        }
    }

    pub fn invalid_output(command: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidOutput {
            command: command.into(),
            message: message.to_string(),
        }
    }
}
