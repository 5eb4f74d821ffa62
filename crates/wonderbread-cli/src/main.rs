//! WONDERBREAD benchmark CLI
//!
//! The `wonderbread` command drives the benchmark's experiment and evaluation
//! scripts and inspects the response contracts their models must satisfy.
//!
//! ## Commands
//!
//! - `run-tasks`: run every experiment task for one model
//! - `run-evals`: score stored experiment results
//! - `schema`: print the structured-output descriptor for a contract
//! - `validate`: check a stored model response against a contract
//! - `contracts`: list the registered contracts

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::{debug, error};

use wonderbread_runner::{
    init_tracing, level_for, Orchestrator, ProcessLauncher, RunError, RunOptions, RunOutcome,
    RunReport, TaskExit, TaskLauncher, TaskStatus, TaskTable, TaskUnit, INTERRUPTED_EXIT_CODE,
};
use wonderbread_schema::{ResponseError, SchemaRegistry};

#[derive(Parser)]
#[command(name = "wonderbread")]
#[command(author = "WONDERBREAD Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run and check the WONDERBREAD benchmark", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all experiment tasks in order, stopping at the first failure
    RunTasks {
        /// Model backend every experiment invokes
        #[arg(long)]
        model: String,

        /// Ask each task for a reduced, fast run
        #[arg(long = "is_debug")]
        is_debug: bool,

        /// Directory holding the experiment scripts
        #[arg(long = "tasks_dir", env = "WONDERBREAD_TASKS_DIR", default_value = "benchmark/tasks")]
        tasks_dir: PathBuf,

        /// Interpreter used to launch each script
        #[arg(long, env = "WONDERBREAD_PYTHON", default_value = "python3")]
        python: String,
    },

    /// Run all evaluation scripts in order, stopping at the first failure
    RunEvals {
        /// Where the experiment results to score are stored
        #[arg(long = "path_to_experimental_results_dir")]
        results_dir: Option<PathBuf>,

        /// Gold demonstration data, used by SOP generation scoring
        #[arg(long = "path_to_data_dir")]
        data_dir: Option<PathBuf>,

        /// Task to skip (repeatable)
        #[arg(long)]
        skip: Vec<String>,

        /// Directory holding the evaluation scripts
        #[arg(long = "eval_dir", env = "WONDERBREAD_EVAL_DIR", default_value = "benchmark/eval")]
        eval_dir: PathBuf,

        /// Interpreter used to launch each script
        #[arg(long, env = "WONDERBREAD_PYTHON", default_value = "python3")]
        python: String,
    },

    /// Print the structured-output descriptor for a contract
    Schema {
        /// Contract name (see `contracts`)
        name: String,

        /// Request strict mode (ignored for contracts with dynamic keys)
        #[arg(long)]
        strict: bool,

        /// Schema name sent to the model API (default: the contract name)
        #[arg(long)]
        schema_name: Option<String>,
    },

    /// Validate a stored model response against a contract
    Validate {
        /// Contract name (see `contracts`)
        name: String,

        /// File holding the raw model output
        file: PathBuf,
    },

    /// List the registered contracts
    Contracts,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging
    init_tracing(cli.json, level_for(cli.verbose, cli.quiet));

    let code = match dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::RunTasks {
            model,
            is_debug,
            tasks_dir,
            python,
        } => {
            let table = TaskTable::experiments(&tasks_dir, &python);
            let options = RunOptions {
                model: Some(model),
                debug: is_debug,
                ..RunOptions::default()
            };
            cmd_run(table, options, Vec::new()).await
        }
        Commands::RunEvals {
            results_dir,
            data_dir,
            skip,
            eval_dir,
            python,
        } => {
            let table = TaskTable::evaluations(&eval_dir, &python);
            // Evaluation scripts take no model or debug flag.
            let options = RunOptions {
                result_dir: results_dir,
                data_dir,
                model: None,
                debug: false,
            };
            cmd_run(table, options, skip).await
        }
        Commands::Schema {
            name,
            strict,
            schema_name,
        } => cmd_schema(&name, strict, schema_name.as_deref()),
        Commands::Validate { name, file } => cmd_validate(&name, &file),
        Commands::Contracts => cmd_contracts(),
    }
}

/// Process exit code for an error that ended a command.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<RunError>()
        .map(RunError::exit_code)
        .unwrap_or(1)
}

/// Process launcher that announces skipped tasks on stdout.
struct ConsoleLauncher(ProcessLauncher);

#[async_trait]
impl TaskLauncher for ConsoleLauncher {
    async fn launch(&self, task: &TaskUnit, args: &[String]) -> wonderbread_runner::Result<TaskExit> {
        self.0.launch(task, args).await
    }

    fn skipped(&self, task: &TaskUnit) {
        println!("Skipping {}", task.name);
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Run a task table with real processes and print the summary.
async fn cmd_run(table: TaskTable, options: RunOptions, skip: Vec<String>) -> Result<i32> {
    debug!(level = table.level.name(), tasks = ?table.names(), "Resolved task table");

    let launcher = ConsoleLauncher(ProcessLauncher);
    let report = Orchestrator::run_until(&table, &options, &skip, &launcher, interrupted()).await?;

    print_report(&report);
    Ok(report.exit_code())
}

fn print_report(report: &RunReport) {
    println!();
    println!("Run ID: {}", report.run_id());
    println!("Level: {}", report.record.level.name());
    println!(
        "Status: {}",
        if report.success() {
            "✓ COMPLETED"
        } else {
            "✗ ABORTED"
        }
    );
    println!("Duration: {}ms", report.duration_ms);
    println!();

    for entry in &report.record.entries {
        match entry.status {
            TaskStatus::Succeeded { duration_ms } => {
                println!("  ✓ {} ({}ms)", entry.task, duration_ms);
            }
            TaskStatus::Failed {
                exit_code,
                duration_ms,
            } => {
                println!(
                    "  ✗ {} ({}ms, exit code: {})",
                    entry.task, duration_ms, exit_code
                );
            }
            TaskStatus::Skipped => println!("  - {} (skipped)", entry.task),
        }
    }

    let launched = report.record.launched().len();
    println!();
    println!("Summary: {}/{} tasks passed", report.passed_count(), launched);

    match &report.outcome {
        RunOutcome::Aborted { task, exit_code } if *exit_code == INTERRUPTED_EXIT_CODE => {
            println!("Interrupted: {} was stopped; later tasks were not run", task);
        }
        RunOutcome::Aborted { task, exit_code } => {
            println!(
                "Aborted: {} exited with code {}; later tasks were not run",
                task, exit_code
            );
        }
        RunOutcome::Completed => {}
    }
}

fn cmd_schema(name: &str, strict: bool, schema_name: Option<&str>) -> Result<i32> {
    let registry = SchemaRegistry::global()?;
    let descriptor = registry.describe(name, schema_name.unwrap_or(name), strict)?;

    if descriptor.strict_downgraded {
        eprintln!(
            "note: {} has dynamic keys; strict mode was turned off",
            name
        );
    }

    let wire = serde_json::to_string_pretty(&descriptor.to_wire())?;
    println!("{}", wire);
    Ok(0)
}

fn cmd_validate(name: &str, file: &Path) -> Result<i32> {
    let registry = SchemaRegistry::global()?;
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read response file {}", file.display()))?;

    match registry.parse(name, &raw) {
        Ok(validated) => {
            println!("✓ {} satisfies {}", file.display(), name);
            for warning in validated.warnings() {
                println!("  ! {}: {}", warning.path, warning.message);
            }
            Ok(0)
        }
        Err(ResponseError::Validation(err)) => {
            println!(
                "✗ {} violates {} ({} issue(s))",
                file.display(),
                name,
                err.issues.len()
            );
            for issue in &err.issues {
                println!("  - {}", issue);
            }
            Ok(1)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to check {}", file.display())),
    }
}

fn cmd_contracts() -> Result<i32> {
    let registry = SchemaRegistry::global()?;
    for name in registry.names() {
        let contract = registry.get(name)?;
        let shape = if contract.is_dynamic_keyed() {
            "dynamic keys"
        } else {
            "fixed fields"
        };
        println!("{} ({})", name, shape);
    }
    Ok(0)
}
