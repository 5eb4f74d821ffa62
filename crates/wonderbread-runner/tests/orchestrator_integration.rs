//! Integration tests for the orchestrator with scripted and real launchers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use wonderbread_runner::fakes::ScriptedLauncher;
use wonderbread_runner::{
    Orchestrator, ProcessLauncher, RunError, RunLevel, RunOptions, RunOutcome, TaskStatus,
    TaskTable, TaskUnit, INTERRUPTED_EXIT_CODE,
};

fn skip(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn three_tasks() -> TaskTable {
    TaskTable::custom(
        RunLevel::Evaluations,
        ["t1", "t2", "t3"]
            .iter()
            .map(|n| TaskUnit::custom(*n, vec!["true".to_string()]))
            .collect(),
    )
}

/// Test: a skipped task is never launched and the run still completes
#[tokio::test]
async fn test_skip_middle_task() {
    let launcher = ScriptedLauncher::new();
    let report = Orchestrator::run(
        &three_tasks(),
        &RunOptions::default(),
        &skip(&["t2"]),
        &launcher,
    )
    .await
    .expect("run failed");

    assert_eq!(launcher.launched(), vec!["t1", "t3"]);
    assert_eq!(launcher.skips(), vec!["t2"]);
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.record.skipped(), vec!["t2"]);
    assert_eq!(report.record.entries.len(), 3, "Every task has an entry");
}

/// Test: the first failure stops the run and its code is propagated
#[tokio::test]
async fn test_failure_stops_later_tasks() {
    let launcher = ScriptedLauncher::new().failing("t2", 42);
    let report = Orchestrator::run(&three_tasks(), &RunOptions::default(), &[], &launcher)
        .await
        .expect("run failed");

    assert_eq!(launcher.launched(), vec!["t1", "t2"], "t3 must not launch");
    assert_eq!(
        report.outcome,
        RunOutcome::Aborted {
            task: "t2".to_string(),
            exit_code: 42
        }
    );
    assert_eq!(report.exit_code(), 42);
    assert_eq!(report.passed_count(), 1);
}

/// Test: skipping the task that would fail lets the run complete
#[tokio::test]
async fn test_skipping_failing_task() {
    let launcher = ScriptedLauncher::new().failing("t2", 1);
    let report = Orchestrator::run(
        &three_tasks(),
        &RunOptions::default(),
        &skip(&["t2"]),
        &launcher,
    )
    .await
    .expect("run failed");

    assert!(report.success());
}

/// Test: unknown skip names are accepted and change nothing
#[tokio::test]
async fn test_unknown_skip_name_ignored() {
    let launcher = ScriptedLauncher::new();
    let report = Orchestrator::run(
        &three_tasks(),
        &RunOptions::default(),
        &skip(&["not_a_task"]),
        &launcher,
    )
    .await
    .expect("run failed");

    assert_eq!(launcher.launched(), vec!["t1", "t2", "t3"]);
    assert!(report.success());
}

/// Test: evaluation options reach the right scripts
#[tokio::test]
async fn test_eval_option_propagation() {
    let dir = tempfile::tempdir().unwrap();
    let table = TaskTable::evaluations(dir.path(), "python3");
    let options = RunOptions {
        result_dir: Some(PathBuf::from("/results")),
        data_dir: Some(PathBuf::from("/gold")),
        model: None,
        debug: false,
    };

    let launcher = ScriptedLauncher::new();
    Orchestrator::run(&table, &options, &[], &launcher)
        .await
        .expect("run failed");

    let launches = launcher.launches();
    assert_eq!(launches.len(), 6);
    assert_eq!(launches[0].task, "sop_generation");
    assert_eq!(
        launches[0].args,
        vec![
            "--path_to_experimental_results_dir",
            "/results",
            "--path_to_data_dir",
            "/gold"
        ]
    );
    for launch in &launches[1..] {
        assert_eq!(
            launch.args,
            vec!["--path_to_experimental_results_dir", "/results"],
            "{} must not receive the data dir",
            launch.task
        );
    }
}

/// Test: experiments receive model and debug flags
#[tokio::test]
async fn test_experiment_option_propagation() {
    let dir = tempfile::tempdir().unwrap();
    let table = TaskTable::experiments(dir.path(), "python3");
    let options = RunOptions {
        model: Some("GPT4".to_string()),
        debug: true,
        ..RunOptions::default()
    };

    let launcher = ScriptedLauncher::new();
    Orchestrator::run(&table, &options, &skip(&["sop_ranking"]), &launcher)
        .await
        .expect("run failed");

    let launches = launcher.launches();
    assert_eq!(launches.len(), 5);
    assert!(launches
        .iter()
        .all(|l| l.args == vec!["--model", "GPT4", "--is_debug"]));
    assert!(launches.iter().all(|l| l.task != "sop_ranking"));
}

/// Test: a missing root directory fails before anything launches
#[tokio::test]
async fn test_missing_root_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("eval");
    let launcher = ScriptedLauncher::new();

    let err = Orchestrator::run(
        &TaskTable::evaluations(&missing, "python3"),
        &RunOptions::default(),
        &[],
        &launcher,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::MissingDirectory { .. }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(
        err.to_string(),
        format!("Eval directory not found at: {}", missing.display())
    );
    assert!(launcher.launched().is_empty());
}

/// Test: experiments refuse to start without a model
#[tokio::test]
async fn test_experiments_require_model() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::new();

    let err = Orchestrator::run(
        &TaskTable::experiments(dir.path(), "python3"),
        &RunOptions::default(),
        &[],
        &launcher,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::MissingOption("model")));
    assert!(launcher.launched().is_empty());
}

fn logging_task(name: &str, log: &Path, exit_code: i32) -> TaskUnit {
    let script = format!("echo {} >> '{}'; exit {}", name, log.display(), exit_code);
    TaskUnit::custom(name, vec!["sh".to_string(), "-c".to_string(), script])
}

fn read_log(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Test: real processes run sequentially and stop at the first failure
#[tokio::test]
async fn test_process_launcher_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("order.log");
    let table = TaskTable::custom(
        RunLevel::Evaluations,
        vec![
            logging_task("first", &log, 0),
            logging_task("second", &log, 3),
            logging_task("third", &log, 0),
        ],
    );

    let report = Orchestrator::run(&table, &RunOptions::default(), &[], &ProcessLauncher)
        .await
        .expect("run failed");

    assert_eq!(read_log(&log), vec!["first", "second"]);
    assert_eq!(report.exit_code(), 3);
    assert!(matches!(
        report.record.entries[1].status,
        TaskStatus::Failed { exit_code: 3, .. }
    ));
}

/// Test: real processes with a skip complete in table order
#[tokio::test]
async fn test_process_launcher_skip() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("order.log");
    let table = TaskTable::custom(
        RunLevel::Evaluations,
        vec![
            logging_task("first", &log, 0),
            logging_task("second", &log, 0),
            logging_task("third", &log, 0),
        ],
    );

    let report = Orchestrator::run(
        &table,
        &RunOptions::default(),
        &skip(&["second"]),
        &ProcessLauncher,
    )
    .await
    .expect("run failed");

    assert_eq!(read_log(&log), vec!["first", "third"]);
    assert!(report.success());
}

/// Test: a task whose executable does not exist is a launch error
#[tokio::test]
async fn test_spawn_failure_is_error() {
    let table = TaskTable::custom(
        RunLevel::Evaluations,
        vec![TaskUnit::custom(
            "ghost",
            vec!["/no/such/interpreter".to_string()],
        )],
    );

    let err = Orchestrator::run(&table, &RunOptions::default(), &[], &ProcessLauncher)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Spawn { ref task, .. } if task == "ghost"));
    assert_eq!(err.exit_code(), 1);
}

/// Test: evaluation scripts take no debug flag, even when one is set
#[tokio::test]
async fn test_eval_tasks_never_receive_debug() {
    let dir = tempfile::tempdir().unwrap();
    let options = RunOptions {
        debug: true,
        ..RunOptions::default()
    };

    let launcher = ScriptedLauncher::new();
    Orchestrator::run(
        &TaskTable::evaluations(dir.path(), "python3"),
        &options,
        &[],
        &launcher,
    )
    .await
    .expect("run failed");

    let launches = launcher.launches();
    assert_eq!(launches.len(), 6);
    assert!(launches.iter().all(|l| l.args.is_empty()));
}

/// Test: an interrupt stops the running process and aborts the run
#[tokio::test]
async fn test_interrupt_stops_running_task() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("survived.log");
    let slow = format!("sleep 1; echo slow >> '{}'", log.display());
    let table = TaskTable::custom(
        RunLevel::Evaluations,
        vec![
            TaskUnit::custom("slow", vec!["sh".to_string(), "-c".to_string(), slow]),
            logging_task("after", &log, 0),
        ],
    );

    let report = Orchestrator::run_until(
        &table,
        &RunOptions::default(),
        &[],
        &ProcessLauncher,
        tokio::time::sleep(Duration::from_millis(200)),
    )
    .await
    .expect("run failed");

    assert_eq!(
        report.outcome,
        RunOutcome::Aborted {
            task: "slow".to_string(),
            exit_code: INTERRUPTED_EXIT_CODE
        }
    );
    assert_eq!(report.exit_code(), INTERRUPTED_EXIT_CODE);

    // Give an orphaned child time to finish if it had survived.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(read_log(&log).is_empty(), "no task may write after the interrupt");
}
