//! Artifact pipeline: write → execute → archive → index.
//!
//! The generated script is treated as opaque bytes. A failing or hanging
//! script does not abort the pipeline; by default whatever the project
//! directory holds afterwards (at least the script itself) is still packaged.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::hierarchy::{Hierarchy, build_hierarchy, render_hierarchy};
use crate::io::archive::{build_archive, list_entries};
use crate::io::config::EtlgenConfig;
use crate::io::process::run_command_with_timeout;
use crate::io::project::{reset_project_dir, resolve_project_dir, write_script};

/// Parameters for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Directory the project directory and archive are created in.
    pub base_dir: PathBuf,
    pub project_dir_name: String,
    pub script_file_name: String,
    /// Program (plus leading arguments) the script file name is appended to.
    pub interpreter: Vec<String>,
    /// Suffix the project directory with a per-run timestamp and id.
    pub unique_dir: bool,
    /// Package the directory even if the script fails or times out.
    pub package_on_failure: bool,
    /// `None` waits for the script indefinitely.
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
}

impl PipelineRequest {
    pub fn from_config(base_dir: &Path, cfg: &EtlgenConfig) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            project_dir_name: cfg.project_dir_name.clone(),
            script_file_name: cfg.script_file_name.clone(),
            interpreter: cfg.interpreter.clone(),
            unique_dir: cfg.unique_project_dirs,
            package_on_failure: cfg.package_on_failure,
            timeout: cfg.run_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }
}

/// How the generated script finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    Succeeded,
    /// Non-zero exit; `exit_code` is `None` when killed by a signal.
    Failed { exit_code: Option<i32> },
    TimedOut,
}

impl ExecutionStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Captured result of running the generated script.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    #[serde(flatten)]
    pub status: ExecutionStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// The zip produced for a run, with its entry list and tree preview.
#[derive(Debug, Clone, Serialize)]
pub struct PackagedArchive {
    pub path: PathBuf,
    pub entries: Vec<String>,
    pub hierarchy: Hierarchy,
}

impl PackagedArchive {
    /// Indented outline of the archive contents.
    pub fn tree_lines(&self) -> Vec<String> {
        render_hierarchy(&self.hierarchy)
    }

    /// Archive file name, used as the download name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub project_dir: PathBuf,
    pub script_path: PathBuf,
    pub execution: ExecutionReport,
    /// `None` only when the script failed and packaging on failure is disabled.
    pub archive: Option<PackagedArchive>,
}

/// Run the generated text through write → execute → archive → index.
///
/// Filesystem errors and failure to spawn the interpreter propagate. A script
/// that exits non-zero or times out is logged and reported in the outcome.
#[instrument(skip_all, fields(base_dir = %request.base_dir.display(), project = %request.project_dir_name))]
pub fn run_pipeline(request: &PipelineRequest, generated_text: &str) -> Result<PipelineOutcome> {
    let project_dir = resolve_project_dir(
        &request.base_dir,
        &request.project_dir_name,
        request.unique_dir,
    );
    reset_project_dir(&project_dir)?;
    let script_path = write_script(&project_dir, &request.script_file_name, generated_text)?;
    info!(script = %script_path.display(), "script written");

    let execution = execute_script(request, &project_dir)?;
    if !execution.status.is_success() {
        warn!(
            status = ?execution.status,
            stderr = %execution.stderr.trim_end(),
            "error during execution of generated script"
        );
        if !request.package_on_failure {
            info!("packaging on failure disabled, skipping archive");
            return Ok(PipelineOutcome {
                project_dir,
                script_path,
                execution,
                archive: None,
            });
        }
    }

    let archive = package_directory(&project_dir)?;
    info!(
        archive = %archive.path.display(),
        entries = archive.entries.len(),
        "project packaged"
    );
    Ok(PipelineOutcome {
        project_dir,
        script_path,
        execution,
        archive: Some(archive),
    })
}

/// Archive `dir` and index the archive's entries.
pub fn package_directory(dir: &Path) -> Result<PackagedArchive> {
    let path = build_archive(dir)?;
    inspect_archive(&path)
}

/// Index an existing archive.
pub fn inspect_archive(path: &Path) -> Result<PackagedArchive> {
    let entries = list_entries(path)?;
    let hierarchy = build_hierarchy(&entries);
    Ok(PackagedArchive {
        path: path.to_path_buf(),
        entries,
        hierarchy,
    })
}

fn execute_script(request: &PipelineRequest, project_dir: &Path) -> Result<ExecutionReport> {
    let (program, leading_args) = request
        .interpreter
        .split_first()
        .context("interpreter must not be empty")?;
    let mut cmd = Command::new(program);
    cmd.args(leading_args)
        .arg(&request.script_file_name)
        .current_dir(project_dir);

    let started = Instant::now();
    let output = run_command_with_timeout(cmd, None, request.timeout, request.output_limit_bytes)
        .with_context(|| format!("run {}", request.script_file_name))?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let status = if output.timed_out {
        ExecutionStatus::TimedOut
    } else if output.status.success() {
        ExecutionStatus::Succeeded
    } else {
        ExecutionStatus::Failed {
            exit_code: output.status.code(),
        }
    };

    Ok(ExecutionReport {
        status,
        stdout: output.stdout_text("script"),
        stderr: output.stderr_text("script"),
        duration_ms,
    })
}
