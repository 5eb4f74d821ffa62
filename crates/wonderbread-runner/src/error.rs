//! Error types for run orchestration.

use std::path::PathBuf;

use thiserror::Error;

use crate::machine::RunState;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("{role} directory not found at: {}", path.display())]
    MissingDirectory { role: &'static str, path: PathBuf },

    #[error("required option missing: {0}")]
    MissingOption(&'static str),

    #[error("task {task} has an empty command")]
    EmptyCommand { task: String },

    #[error("failed to launch task {task}: {source}")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task {task} failed with exit code {exit_code}")]
    TaskFailed { task: String, exit_code: i32 },

    #[error("invalid run transition: cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: RunState,
    },
}

impl RunError {
    /// Process exit code the orchestrator reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::TaskFailed { exit_code, .. } => *exit_code,
            _ => 1,
        }
    }
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failed_propagates_code() {
        let err = RunError::TaskFailed {
            task: "sop_ranking".to_string(),
            exit_code: 3,
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("sop_ranking"));
    }

    #[test]
    fn test_missing_directory_exit_code() {
        let err = RunError::MissingDirectory {
            role: "Tasks",
            path: PathBuf::from("/nope/tasks"),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Tasks directory not found at: /nope/tasks");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = RunError::InvalidTransition {
            action: "complete",
            state: RunState::Pending,
        };
        assert!(err.to_string().contains("cannot complete while Pending"));
    }
}
