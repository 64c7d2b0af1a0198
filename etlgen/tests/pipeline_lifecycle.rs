//! End-to-end pipeline scenarios.
//!
//! Each test drives `run_pipeline` or `generate_project` against a temporary
//! base directory using `sh` as the interpreter, then inspects the project
//! directory, the archive and the rendered tree.

use std::fs;
use std::time::{Duration, Instant};

use etlgen::generate::generate_project;
use etlgen::io::archive::list_entries;
use etlgen::io::pipeline::{ExecutionStatus, PipelineRequest, run_pipeline};
use etlgen::test_support::{ScriptedGenerator, TestWorkspace, sh_config};

fn request(workspace: &TestWorkspace) -> PipelineRequest {
    PipelineRequest::from_config(workspace.path(), &sh_config())
}

#[test]
fn script_is_written_run_and_packaged() {
    let workspace = TestWorkspace::new().expect("workspace");
    let outcome = run_pipeline(&request(&workspace), "echo hi").expect("pipeline");

    let script = fs::read_to_string(workspace.join("proj/run.sh")).expect("script");
    assert_eq!(script, "echo hi");
    assert_eq!(outcome.execution.status, ExecutionStatus::Succeeded);

    let archive = outcome.archive.expect("archive");
    assert_eq!(archive.path, workspace.join("proj.zip"));
    assert_eq!(list_entries(&archive.path).expect("entries"), vec!["run.sh"]);
    assert_eq!(archive.tree_lines(), vec!["run.sh"]);
}

#[test]
fn failing_script_is_still_packaged() {
    let workspace = TestWorkspace::new().expect("workspace");
    let outcome = run_pipeline(
        &request(&workspace),
        "mkdir -p bronze\necho partial > bronze/raw.json\nexit 3",
    )
    .expect("pipeline");

    assert_eq!(
        outcome.execution.status,
        ExecutionStatus::Failed { exit_code: Some(3) }
    );
    let archive = outcome.archive.expect("archive on failure");
    assert_eq!(archive.entries, vec!["bronze/raw.json", "run.sh"]);
}

#[test]
fn rerun_resets_project_directory() {
    let workspace = TestWorkspace::new().expect("workspace");
    run_pipeline(&request(&workspace), "echo one > first.txt").expect("first run");
    assert!(workspace.join("proj/first.txt").exists());

    let outcome = run_pipeline(&request(&workspace), "echo two > second.txt").expect("second run");

    assert!(!workspace.join("proj/first.txt").exists());
    let archive = outcome.archive.expect("archive");
    assert_eq!(archive.entries, vec!["run.sh", "second.txt"]);
}

#[test]
fn nested_outputs_render_as_tree() {
    let workspace = TestWorkspace::new().expect("workspace");
    let script = "\
mkdir -p sales/bronze sales/silver
echo '{}' > sales/bronze/raw.json
echo 'id,amount' > sales/silver/clean.csv
echo 'def read(): pass' > sales/common.py
";
    let outcome = run_pipeline(&request(&workspace), script).expect("pipeline");
    let archive = outcome.archive.expect("archive");

    assert_eq!(
        archive.tree_lines(),
        vec![
            "run.sh",
            "sales",
            "    ├── bronze",
            "        ├── raw.json",
            "    ├── common.py",
            "    ├── silver",
            "        ├── clean.csv",
        ]
    );
}

#[test]
fn timed_out_script_is_reported_and_packaged() {
    let workspace = TestWorkspace::new().expect("workspace");
    let mut request = request(&workspace);
    request.timeout = Some(Duration::from_millis(300));

    let outcome = run_pipeline(&request, "echo started > log.txt\nsleep 2").expect("pipeline");

    assert_eq!(outcome.execution.status, ExecutionStatus::TimedOut);
    let archive = outcome.archive.expect("archive");
    assert!(archive.entries.contains(&"run.sh".to_string()));
}

#[test]
fn timeout_bounds_pipeline_when_script_spawns_children() {
    let workspace = TestWorkspace::new().expect("workspace");
    let mut request = request(&workspace);
    request.timeout = Some(Duration::from_millis(300));

    let started = Instant::now();
    let outcome =
        run_pipeline(&request, "echo started\nsleep 8\necho done").expect("pipeline");

    assert!(
        started.elapsed() < Duration::from_secs(4),
        "pipeline took {:?}",
        started.elapsed()
    );
    assert_eq!(outcome.execution.status, ExecutionStatus::TimedOut);
    assert!(outcome.archive.is_some());
}

#[test]
fn unique_directories_do_not_collide() {
    let workspace = TestWorkspace::new().expect("workspace");
    let mut request = request(&workspace);
    request.unique_dir = true;

    let first = run_pipeline(&request, "echo a").expect("first");
    let second = run_pipeline(&request, "echo b").expect("second");

    assert_ne!(first.project_dir, second.project_dir);
    assert!(first.project_dir.is_dir());
    assert!(second.project_dir.is_dir());
    let first_zip = first.archive.expect("first archive").path;
    let second_zip = second.archive.expect("second archive").path;
    assert!(first_zip.exists());
    assert!(second_zip.exists());
    assert!(!workspace.join("proj").exists());
}

#[test]
fn generate_project_runs_generated_code() {
    let workspace = TestWorkspace::new().expect("workspace");
    let generator = ScriptedGenerator::always("```python\nmkdir -p gold\necho ok > gold/summary.csv\n```");

    let outcome = generate_project(
        &generator,
        "Project Title: Sales\nBronze Layer: ingest",
        workspace.path(),
        &sh_config(),
    )
    .expect("generate");

    assert_eq!(generator.calls(), 1);
    assert_eq!(outcome.code, "mkdir -p gold\necho ok > gold/summary.csv");
    assert!(outcome.pipeline.execution.status.is_success());
    let archive = outcome.pipeline.archive.expect("archive");
    assert_eq!(
        archive.tree_lines(),
        vec!["gold", "    ├── summary.csv", "run.sh"]
    );
}
