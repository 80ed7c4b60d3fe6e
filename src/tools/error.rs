//! Command Guard Error Types

use super::executor::ExecutionOutcome;
use std::fmt;

/// Why a command line was refused before anything was spawned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// No tokens at all
    Empty,
    /// Unbalanced quotes or a dangling escape
    Malformed,
    /// Base command is not an allowlist key
    NotAllowed(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::Empty => write!(f, "command line is empty"),
            RejectionReason::Malformed => {
                write!(f, "command line could not be tokenized (unbalanced quotes?)")
            }
            RejectionReason::NotAllowed(command) => {
                write!(f, "command '{}' is not in the allowlist", command)
            }
        }
    }
}

/// Error types for guarded command execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Validation failed; no process was spawned
    #[error("Command rejected: {0}")]
    Rejected(RejectionReason),

    /// The process outlived its wall-clock budget and was killed
    ///
    /// Carries whatever output was captured before termination.
    #[error("Command timed out after {:.0}ms", .0.duration_ms)]
    Timeout(Box<ExecutionOutcome>),

    /// The process could not be spawned or waited on
    #[error("Failed to execute '{command}': {message}")]
    Failure { command: String, message: String },
}

impl CommandError {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::Rejected(_) => "rejected",
            CommandError::Timeout(_) => "timeout",
            CommandError::Failure { .. } => "failure",
        }
    }
}
