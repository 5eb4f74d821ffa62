//! Options propagated from the orchestrator to each task.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RunError};
use crate::task::{RunLevel, TaskUnit};

/// An option a task may declare it understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    ResultDir,
    DataDir,
    Model,
    Debug,
}

impl OptionKind {
    /// Command-line flag the task scripts expect.
    pub fn flag(&self) -> &'static str {
        match self {
            OptionKind::ResultDir => "--path_to_experimental_results_dir",
            OptionKind::DataDir => "--path_to_data_dir",
            OptionKind::Model => "--model",
            OptionKind::Debug => "--is_debug",
        }
    }
}

/// Run-wide option values. Unset options are never passed, so each task's
/// own defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Where every task writes (and evaluations read) experimental results.
    pub result_dir: Option<PathBuf>,

    /// Gold demonstration data, for the tasks that consume it.
    pub data_dir: Option<PathBuf>,

    /// Model backend each experiment invokes.
    pub model: Option<String>,

    /// Ask tasks for a reduced, fast run.
    pub debug: bool,
}

impl RunOptions {
    /// Experiments cannot run without a model.
    pub fn check_required(&self, level: RunLevel) -> Result<()> {
        match level {
            RunLevel::Experiments if self.model.is_none() => Err(RunError::MissingOption("model")),
            _ => Ok(()),
        }
    }

    /// Arguments for `task`: only options it accepts that are actually set,
    /// in declaration order of [`OptionKind`].
    pub fn args_for(&self, task: &TaskUnit) -> Vec<String> {
        let mut args = Vec::new();

        if task.accepts(OptionKind::ResultDir) {
            if let Some(dir) = &self.result_dir {
                args.push(OptionKind::ResultDir.flag().to_string());
                args.push(dir.to_string_lossy().into_owned());
            }
        }
        if task.accepts(OptionKind::DataDir) {
            if let Some(dir) = &self.data_dir {
                args.push(OptionKind::DataDir.flag().to_string());
                args.push(dir.to_string_lossy().into_owned());
            }
        }
        if task.accepts(OptionKind::Model) {
            if let Some(model) = &self.model {
                args.push(OptionKind::Model.flag().to_string());
                args.push(model.clone());
            }
        }
        if task.accepts(OptionKind::Debug) && self.debug {
            args.push(OptionKind::Debug.flag().to_string());
        }

        args
    }
}
