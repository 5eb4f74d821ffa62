//! The per-run record of what happened to each task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::RunLevel;

/// Final state of one task in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded { duration_ms: u64 },
    Failed { exit_code: i32, duration_ms: u64 },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub task: String,
    #[serde(flatten)]
    pub status: TaskStatus,
}

impl RunEntry {
    /// Exit code of a launched task; `None` when skipped.
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            TaskStatus::Succeeded { .. } => Some(0),
            TaskStatus::Failed { exit_code, .. } => Some(exit_code),
            TaskStatus::Skipped => None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every task ran or was skipped, none failed.
    Completed,

    /// The named task failed; later tasks were not attempted.
    Aborted { task: String, exit_code: i32 },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }

    /// 0 on completion, otherwise the failing task's code.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::Aborted { exit_code, .. } => *exit_code,
        }
    }
}

/// Ordered (task -> status) pairs accumulated during one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub level: RunLevel,
    pub started_at: DateTime<Utc>,
    pub entries: Vec<RunEntry>,
}

impl RunRecord {
    pub fn new(level: RunLevel) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            level,
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, task: &str, status: TaskStatus) {
        self.entries.push(RunEntry {
            task: task.to_string(),
            status,
        });
    }

    /// Names of tasks that were launched, in launch order.
    pub fn launched(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.status != TaskStatus::Skipped)
            .map(|e| e.task.as_str())
            .collect()
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.status == TaskStatus::Skipped)
            .map(|e| e.task.as_str())
            .collect()
    }

    pub fn passed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, TaskStatus::Succeeded { .. }))
            .count()
    }
}
