//! Task tables for the experiment and evaluation levels.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, RunError};
use crate::options::OptionKind;

/// Which ordered table a run drives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunLevel {
    /// Model experiments: SOP generation through question answering.
    Experiments,

    /// Scoring of stored experiment results.
    Evaluations,
}

impl RunLevel {
    pub fn name(&self) -> &'static str {
        match self {
            RunLevel::Experiments => "experiments",
            RunLevel::Evaluations => "evaluations",
        }
    }

    fn root_role(&self) -> &'static str {
        match self {
            RunLevel::Experiments => "Tasks",
            RunLevel::Evaluations => "Eval",
        }
    }
}

/// Experiment scripts, in run order.
///
/// Knowledge-transfer tasks read SOPs written by earlier tasks, so the order
/// is part of the contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentTask {
    SopGeneration,
    DemoSegmentation,
    SopImprovement,
    SopRanking,
    DemoValidation,
    QuestionAnswering,
}

impl ExperimentTask {
    pub const ALL: [ExperimentTask; 6] = [
        ExperimentTask::SopGeneration,
        ExperimentTask::DemoSegmentation,
        ExperimentTask::SopImprovement,
        ExperimentTask::SopRanking,
        ExperimentTask::DemoValidation,
        ExperimentTask::QuestionAnswering,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExperimentTask::SopGeneration => "sop_generation",
            ExperimentTask::DemoSegmentation => "demo_segmentation",
            ExperimentTask::SopImprovement => "sop_improvement",
            ExperimentTask::SopRanking => "sop_ranking",
            ExperimentTask::DemoValidation => "demo_validation",
            ExperimentTask::QuestionAnswering => "question_answering",
        }
    }

    /// Script path relative to the tasks directory.
    pub fn script(&self) -> &'static str {
        match self {
            ExperimentTask::SopGeneration => "documentation/sop_generation/run_experiments.py",
            ExperimentTask::DemoSegmentation => "documentation/demo_segmentation/run_experiments.py",
            ExperimentTask::SopImprovement => "improvement/sop_improvement/run_experiments.py",
            ExperimentTask::SopRanking => "improvement/sop_ranking/run_experiments.py",
            ExperimentTask::DemoValidation => "knowledge_transfer/demo_validation/run_experiments.py",
            ExperimentTask::QuestionAnswering => {
                "knowledge_transfer/question_answering/run_experiments.py"
            }
        }
    }

    pub fn accepts(&self) -> &'static [OptionKind] {
        &[OptionKind::Model, OptionKind::Debug]
    }
}

/// Evaluation scripts, in run order. Names double as `--skip` keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvalTask {
    SopGeneration,
    DemoSegmentation,
    SopImprovement,
    SopRanking,
    DemoValidation,
    QuestionAnswering,
}

impl EvalTask {
    pub const ALL: [EvalTask; 6] = [
        EvalTask::SopGeneration,
        EvalTask::DemoSegmentation,
        EvalTask::SopImprovement,
        EvalTask::SopRanking,
        EvalTask::DemoValidation,
        EvalTask::QuestionAnswering,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EvalTask::SopGeneration => "sop_generation",
            EvalTask::DemoSegmentation => "demo_segmentation",
            EvalTask::SopImprovement => "sop_improvement",
            EvalTask::SopRanking => "sop_ranking",
            EvalTask::DemoValidation => "demo_validation",
            EvalTask::QuestionAnswering => "question_answering",
        }
    }

    /// Script file name inside the eval directory.
    pub fn script(&self) -> String {
        format!("run_{}.py", self.name())
    }

    /// Only SOP generation scoring reads the gold demonstrations.
    pub fn accepts(&self) -> &'static [OptionKind] {
        match self {
            EvalTask::SopGeneration => &[OptionKind::ResultDir, OptionKind::DataDir],
            _ => &[OptionKind::ResultDir],
        }
    }
}

/// One runnable step of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUnit {
    /// Task name, used for skipping and reporting.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Working directory for the process; inherits the caller's when unset.
    pub working_dir: Option<PathBuf>,

    /// Options this task understands.
    pub accepts: Vec<OptionKind>,
}

impl TaskUnit {
    /// Create a task from an arbitrary command.
    pub fn custom(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            working_dir: None,
            accepts: Vec::new(),
        }
    }

    fn script(name: &str, interpreter: &str, script: PathBuf, working_dir: &Path, accepts: &[OptionKind]) -> Self {
        Self {
            name: name.to_string(),
            command: vec![
                interpreter.to_string(),
                script.to_string_lossy().into_owned(),
            ],
            working_dir: Some(working_dir.to_path_buf()),
            accepts: accepts.to_vec(),
        }
    }

    /// Declare the options this task receives (builder pattern).
    pub fn accepting(mut self, kinds: &[OptionKind]) -> Self {
        self.accepts = kinds.to_vec();
        self
    }

    /// Run this task inside `dir`.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn accepts(&self, kind: OptionKind) -> bool {
        self.accepts.contains(&kind)
    }
}

/// A fixed, ordered list of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTable {
    pub level: RunLevel,

    /// Directory holding the scripts; checked before any task launches.
    pub root: Option<PathBuf>,

    pub tasks: Vec<TaskUnit>,
}

impl TaskTable {
    /// The benchmark experiment table, rooted at the tasks directory.
    pub fn experiments(root: &Path, interpreter: &str) -> Self {
        let tasks = ExperimentTask::ALL
            .iter()
            .map(|t| TaskUnit::script(t.name(), interpreter, root.join(t.script()), root, t.accepts()))
            .collect();
        Self {
            level: RunLevel::Experiments,
            root: Some(root.to_path_buf()),
            tasks,
        }
    }

    /// The benchmark evaluation table, rooted at the eval directory.
    pub fn evaluations(root: &Path, interpreter: &str) -> Self {
        let tasks = EvalTask::ALL
            .iter()
            .map(|t| TaskUnit::script(t.name(), interpreter, root.join(t.script()), root, t.accepts()))
            .collect();
        Self {
            level: RunLevel::Evaluations,
            root: Some(root.to_path_buf()),
            tasks,
        }
    }

    /// A table of arbitrary tasks with no root directory.
    pub fn custom(level: RunLevel, tasks: Vec<TaskUnit>) -> Self {
        Self {
            level,
            root: None,
            tasks,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name == name)
    }

    /// Deterministic SHA-256 of the ordered task names.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.level.name().as_bytes());
        hasher.update(b"\0");
        for task in &self.tasks {
            hasher.update(task.name.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }

    /// Fail with [`RunError::MissingDirectory`] when the root does not exist.
    pub fn ensure_root(&self) -> Result<()> {
        match &self.root {
            Some(root) if !root.is_dir() => Err(RunError::MissingDirectory {
                role: self.level.root_role(),
                path: root.clone(),
            }),
            _ => Ok(()),
        }
    }
}
