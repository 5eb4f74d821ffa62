//! Sequential, fail-fast orchestration of a task table.

use std::future::{self, Future};
use std::time::Instant;

use tracing::{debug, error, warn, Instrument};
use uuid::Uuid;

use crate::error::{Result, RunError};
use crate::launcher::{TaskExit, TaskLauncher, INTERRUPTED_EXIT_CODE};
use crate::machine::{RunMachine, Step};
use crate::obs;
use crate::options::RunOptions;
use crate::record::{RunOutcome, RunRecord};
use crate::task::TaskTable;

/// Result of one orchestrated run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Per-task statuses, in table order.
    pub record: RunRecord,

    pub outcome: RunOutcome,

    /// Digest of the table that was run.
    pub table_digest: String,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    /// Identifier shared by every event of this run.
    pub fn run_id(&self) -> &Uuid {
        &self.record.run_id
    }

    /// True when no task failed.
    pub fn success(&self) -> bool {
        self.outcome.is_completed()
    }

    /// Exit code the orchestrator process should terminate with.
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    /// Number of tasks that exited with code 0.
    pub fn passed_count(&self) -> usize {
        self.record.passed_count()
    }

    /// The record on completion, [`RunError::TaskFailed`] on abort.
    pub fn into_result(self) -> Result<RunRecord> {
        match self.outcome {
            RunOutcome::Completed => Ok(self.record),
            RunOutcome::Aborted { task, exit_code } => {
                Err(RunError::TaskFailed { task, exit_code })
            }
        }
    }
}

/// Drives a [`TaskTable`] through a [`TaskLauncher`].
pub struct Orchestrator;

impl Orchestrator {
    /// Run every task of `table` in order, skipping the names in `skip`.
    ///
    /// The root directory and required options are checked before anything
    /// launches. The first task to exit non-zero aborts the run, and its exit
    /// code becomes the report's. A task that cannot be spawned at all is an
    /// error rather than an aborted report.
    pub async fn run<L>(
        table: &TaskTable,
        options: &RunOptions,
        skip: &[String],
        launcher: &L,
    ) -> Result<RunReport>
    where
        L: TaskLauncher + ?Sized,
    {
        Self::run_until(table, options, skip, launcher, future::pending::<()>()).await
    }

    /// Like [`Orchestrator::run`], but stops when `shutdown` resolves.
    ///
    /// The task running at that moment is stopped and recorded as failed with
    /// [`INTERRUPTED_EXIT_CODE`], which aborts the run.
    pub async fn run_until<L, F>(
        table: &TaskTable,
        options: &RunOptions,
        skip: &[String],
        launcher: &L,
        shutdown: F,
    ) -> Result<RunReport>
    where
        L: TaskLauncher + ?Sized,
        F: Future<Output = ()>,
    {
        table.ensure_root()?;
        options.check_required(table.level)?;

        for name in skip.iter().filter(|n| !table.contains(n)) {
            debug!(task = %name, "Skip name matches no task");
        }

        let start = Instant::now();
        let table_digest = table.digest();
        let mut machine = RunMachine::new(table, skip.iter().cloned());
        let run_id = machine.record().run_id;
        tokio::pin!(shutdown);

        obs::emit_run_started(&run_id, table.level, table.tasks.len(), &table_digest);

        let outcome = loop {
            match machine.advance()? {
                Step::Skip(index) => {
                    let task = &table.tasks[index];
                    obs::emit_task_skipped(&run_id, &task.name);
                    launcher.skipped(task);
                }
                Step::Launch(index) => {
                    let task = &table.tasks[index];
                    let args = options.args_for(task);
                    obs::emit_task_launched(&run_id, &task.name, &args);

                    let task_start = Instant::now();
                    let launched = tokio::select! {
                        result = launcher
                            .launch(task, &args)
                            .instrument(obs::task_span(&run_id, &task.name, index)) => Some(result),
                        _ = &mut shutdown => None,
                    };

                    let exit = match launched {
                        Some(Ok(exit)) => exit,
                        Some(Err(e)) => {
                            error!(run_id = %run_id, task = %task.name, error = %e, "Task launch failed");
                            return Err(e);
                        }
                        None => {
                            warn!(run_id = %run_id, task = %task.name, "Run interrupted; task stopped");
                            TaskExit {
                                exit_code: INTERRUPTED_EXIT_CODE,
                                duration_ms: task_start.elapsed().as_millis() as u64,
                            }
                        }
                    };

                    obs::emit_task_exited(&run_id, &task.name, exit.exit_code, exit.duration_ms);
                    machine.complete(exit.exit_code, exit.duration_ms)?;
                }
                Step::Finish(outcome) => break outcome,
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        obs::emit_run_finished(&run_id, &outcome, duration_ms);

        Ok(RunReport {
            record: machine.into_record(),
            outcome,
            table_digest,
            duration_ms,
        })
    }
}
