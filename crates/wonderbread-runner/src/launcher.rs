//! Launching a task as an external process.

use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Result, RunError};
use crate::task::TaskUnit;

/// Exit code recorded for a task cut short by an interrupt.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// How a launched task terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskExit {
    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl TaskExit {
    /// Whether the task exited with code 0.
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs one task to completion.
#[async_trait]
pub trait TaskLauncher: Send + Sync {
    /// Launch `task` with the extra `args` and wait for it to terminate.
    ///
    /// Dropping the returned future must stop the task.
    async fn launch(&self, task: &TaskUnit, args: &[String]) -> Result<TaskExit>;

    /// Called in place of [`TaskLauncher::launch`] for a skipped task.
    fn skipped(&self, _task: &TaskUnit) {}
}

/// Spawns each task as a child process sharing this process's stdio.
///
/// No timeout is applied; a hung task holds the run until it is killed.
/// The child is killed if the launch future is dropped before it exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl TaskLauncher for ProcessLauncher {
    async fn launch(&self, task: &TaskUnit, args: &[String]) -> Result<TaskExit> {
        let start = Instant::now();

        let Some((exe, base_args)) = task.command.split_first() else {
            return Err(RunError::EmptyCommand {
                task: task.name.clone(),
            });
        };

        let mut command = Command::new(exe);
        command
            .args(base_args)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &task.working_dir {
            command.current_dir(dir);
        }

        let status = command.status().await.map_err(|source| RunError::Spawn {
            task: task.name.clone(),
            source,
        })?;

        Ok(TaskExit {
            exit_code: exit_code_of(status),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Exit code, or `128 + signal` for a process killed by a signal.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
