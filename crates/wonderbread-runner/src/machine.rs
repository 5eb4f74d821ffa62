//! Explicit run state machine.
//!
//! ```text
//! PENDING -> RUNNING[i] -> ADVANCING[i] -> RUNNING[i+1] ... -> COMPLETED
//!                      \-> ABORTED
//! PENDING/ADVANCING[i-1] -> ADVANCING[i]        (task i skipped)
//! ```
//!
//! The machine decides what happens next; the caller performs the launch and
//! reports the exit code back through [`RunMachine::complete`].

use std::collections::BTreeSet;

use crate::error::{Result, RunError};
use crate::record::{RunOutcome, RunRecord, TaskStatus};
use crate::task::TaskTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running(usize),
    Advancing(usize),
    Completed,
    Aborted { index: usize, exit_code: i32 },
}

impl RunState {
    /// True once the run has completed or aborted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted { .. })
    }
}

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Task `i` was skipped; nothing to launch.
    Skip(usize),

    /// Launch task `i`, then call [`RunMachine::complete`].
    Launch(usize),

    /// The run is over.
    Finish(RunOutcome),
}

pub struct RunMachine {
    names: Vec<String>,
    skip: BTreeSet<String>,
    state: RunState,
    record: RunRecord,
}

impl RunMachine {
    /// Machine for one pass over `table`, pending, with `skip` naming the
    /// tasks to pass over.
    pub fn new<I, S>(table: &TaskTable, skip: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: table.tasks.iter().map(|t| t.name.clone()).collect(),
            skip: skip.into_iter().map(Into::into).collect(),
            state: RunState::Pending,
            record: RunRecord::new(table.level),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Consume the machine, keeping what it recorded.
    pub fn into_record(self) -> RunRecord {
        self.record
    }

    /// Move past the current position.
    ///
    /// Skipped tasks never enter `Running`. Calling this while a task is
    /// running is an error; calling it in a terminal state repeats the outcome.
    pub fn advance(&mut self) -> Result<Step> {
        let next = match self.state {
            RunState::Pending => 0,
            RunState::Advancing(i) => i + 1,
            RunState::Running(_) => return Err(self.invalid("advance")),
            RunState::Completed | RunState::Aborted { .. } => {
                return Ok(Step::Finish(self.terminal_outcome()))
            }
        };

        let Some(name) = self.names.get(next) else {
            self.state = RunState::Completed;
            return Ok(Step::Finish(RunOutcome::Completed));
        };

        if self.skip.contains(name) {
            self.record.push(name, TaskStatus::Skipped);
            self.state = RunState::Advancing(next);
            return Ok(Step::Skip(next));
        }

        self.state = RunState::Running(next);
        Ok(Step::Launch(next))
    }

    /// Report the exit code of the running task.
    pub fn complete(&mut self, exit_code: i32, duration_ms: u64) -> Result<&RunState> {
        let RunState::Running(index) = self.state else {
            return Err(self.invalid("complete"));
        };
        let name = &self.names[index];

        if exit_code == 0 {
            self.record.push(name, TaskStatus::Succeeded { duration_ms });
            self.state = RunState::Advancing(index);
        } else {
            self.record.push(
                name,
                TaskStatus::Failed {
                    exit_code,
                    duration_ms,
                },
            );
            self.state = RunState::Aborted { index, exit_code };
        }
        Ok(&self.state)
    }

    fn terminal_outcome(&self) -> RunOutcome {
        match self.state {
            RunState::Aborted { index, exit_code } => RunOutcome::Aborted {
                task: self.names[index].clone(),
                exit_code,
            },
            _ => RunOutcome::Completed,
        }
    }

    fn invalid(&self, action: &'static str) -> RunError {
        RunError::InvalidTransition {
            action,
            state: self.state.clone(),
        }
    }
}
