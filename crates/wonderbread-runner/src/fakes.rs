//! In-memory launcher for tests (no processes are spawned)
//!
//! `ScriptedLauncher` returns a preset exit code per task name and records
//! every launch with the arguments it received.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::launcher::{TaskExit, TaskLauncher};
use crate::task::TaskUnit;

/// A single recorded launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub task: String,
    pub args: Vec<String>,
}

/// Launcher returning scripted exit codes.
#[derive(Debug, Default)]
pub struct ScriptedLauncher {
    exit_codes: HashMap<String, i32>,
    launches: Mutex<Vec<Launch>>,
    skips: Mutex<Vec<String>>,
}

impl ScriptedLauncher {
    /// Every task succeeds unless told otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `task` exit with `code` (builder pattern).
    pub fn failing(mut self, task: &str, code: i32) -> Self {
        self.exit_codes.insert(task.to_string(), code);
        self
    }

    /// Every launch so far, with its arguments.
    pub fn launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }

    /// Names of launched tasks in order.
    pub fn launched(&self) -> Vec<String> {
        self.launches().into_iter().map(|l| l.task).collect()
    }

    /// Names of tasks reported as skipped, in order.
    pub fn skips(&self) -> Vec<String> {
        self.skips.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskLauncher for ScriptedLauncher {
    async fn launch(&self, task: &TaskUnit, args: &[String]) -> Result<TaskExit> {
        self.launches.lock().unwrap().push(Launch {
            task: task.name.clone(),
            args: args.to_vec(),
        });
        Ok(TaskExit {
            exit_code: self.exit_codes.get(&task.name).copied().unwrap_or(0),
            duration_ms: 0,
        })
    }

    fn skipped(&self, task: &TaskUnit) {
        self.skips.lock().unwrap().push(task.name.clone());
    }
}
