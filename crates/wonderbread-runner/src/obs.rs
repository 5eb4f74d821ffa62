//! Structured lifecycle events for orchestrated runs.
//!
//! Every function emits one event with a stable `event` field so log
//! pipelines can follow a run: `run.started`, `task.skipped`,
//! `task.launched`, `task.exited`, `run.finished`.

use tracing::{error, info, Span};
use uuid::Uuid;

use crate::record::RunOutcome;
use crate::task::RunLevel;

/// Span covering one launched task. Attach with `Instrument::instrument`.
pub fn task_span(run_id: &Uuid, task: &str, index: usize) -> Span {
    tracing::info_span!("run.task", run_id = %run_id, task = %task, index = index)
}

/// Emit event: a run passed its checks and is about to launch.
pub fn emit_run_started(run_id: &Uuid, level: RunLevel, task_count: usize, table_digest: &str) {
    let short_digest = table_digest.get(..12).unwrap_or(table_digest);
    info!(
        event = "run.started",
        run_id = %run_id,
        level = level.name(),
        task_count = task_count,
        table_digest = %short_digest,
    );
}

/// Emit event: a task was skipped at the caller's request.
pub fn emit_task_skipped(run_id: &Uuid, task: &str) {
    info!(event = "task.skipped", run_id = %run_id, task = %task, "Skipping {}", task);
}

/// Emit event: a task process is being started with `args`.
pub fn emit_task_launched(run_id: &Uuid, task: &str, args: &[String]) {
    info!(
        event = "task.launched",
        run_id = %run_id,
        task = %task,
        args = ?args,
    );
}

/// Emit event: a launched task terminated.
pub fn emit_task_exited(run_id: &Uuid, task: &str, exit_code: i32, duration_ms: u64) {
    if exit_code == 0 {
        info!(event = "task.exited", run_id = %run_id, task = %task, exit_code, duration_ms);
    } else {
        error!(event = "task.exited", run_id = %run_id, task = %task, exit_code, duration_ms);
    }
}

/// Emit event: run reached a terminal state.
pub fn emit_run_finished(run_id: &Uuid, outcome: &RunOutcome, duration_ms: u64) {
    match outcome {
        RunOutcome::Completed => {
            info!(event = "run.finished", run_id = %run_id, outcome = "completed", duration_ms);
        }
        RunOutcome::Aborted { task, exit_code } => {
            error!(
                event = "run.finished",
                run_id = %run_id,
                outcome = "aborted",
                task = %task,
                exit_code = *exit_code,
                duration_ms,
            );
        }
    }
}
