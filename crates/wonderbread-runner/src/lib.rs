//! WONDERBREAD runner - sequential, fail-fast task orchestration
//!
//! Drives the benchmark's experiment and evaluation scripts:
//! - Fixed, ordered task tables per run level
//! - Per-task option propagation and skipping
//! - Abort on the first non-zero exit, propagating its code

pub mod error;
pub mod fakes;
pub mod launcher;
pub mod machine;
pub mod obs;
pub mod options;
pub mod orchestrator;
pub mod record;
pub mod task;
pub mod telemetry;

// Re-export key types
pub use error::{Result, RunError};
pub use launcher::{ProcessLauncher, TaskExit, TaskLauncher, INTERRUPTED_EXIT_CODE};
pub use machine::{RunMachine, RunState, Step};
pub use options::{OptionKind, RunOptions};
pub use orchestrator::{Orchestrator, RunReport};
pub use record::{RunEntry, RunOutcome, RunRecord, TaskStatus};
pub use task::{EvalTask, ExperimentTask, RunLevel, TaskTable, TaskUnit};
pub use telemetry::{init_tracing, level_for};
