//! Shared application state for the UI server.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use etlgen::core::typewriter::code_lines;
use etlgen::io::config::EtlgenConfig;
use etlgen::io::generator::CodeGenerator;
use etlgen::io::pipeline::{ExecutionReport, PipelineOutcome};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// One completed generate request.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Project directory name, unique per request.
    pub run_id: String,
    /// Code exactly as written to disk.
    pub code: String,
    pub outcome: PipelineOutcome,
}

impl RunRecord {
    pub fn new(code: String, outcome: PipelineOutcome) -> Self {
        let run_id = outcome
            .project_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| outcome.project_dir.display().to_string());
        Self {
            run_id,
            code,
            outcome,
        }
    }

    pub fn summary(&self) -> RunSummary {
        let archive = self.outcome.archive.as_ref();
        RunSummary {
            run_id: self.run_id.clone(),
            execution: self.outcome.execution.clone(),
            archive_name: archive.map(|a| a.file_name()),
            tree: archive.map(|a| a.tree_lines()).unwrap_or_default(),
            line_count: code_lines(&self.code).len(),
        }
    }
}

/// JSON shape returned for a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub execution: ExecutionReport,
    pub archive_name: Option<String>,
    pub tree: Vec<String>,
    pub line_count: usize,
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Directory run directories and archives are created in.
    pub base_dir: PathBuf,
    pub config: Arc<EtlgenConfig>,
    pub generator: Arc<dyn CodeGenerator>,
    runs: Arc<RwLock<RunRegistry>>,
}

/// Runs by id plus their recording order; the back of `order` is the latest.
#[derive(Default)]
struct RunRegistry {
    by_id: HashMap<String, Arc<RunRecord>>,
    order: VecDeque<String>,
}

impl RunRegistry {
    /// Insert `record`, returning the runs pushed out beyond `max_runs`.
    fn insert(&mut self, record: Arc<RunRecord>, max_runs: usize) -> Vec<Arc<RunRecord>> {
        if self
            .by_id
            .insert(record.run_id.clone(), Arc::clone(&record))
            .is_some()
        {
            self.order.retain(|id| id != &record.run_id);
        }
        self.order.push_back(record.run_id.clone());

        let mut evicted = Vec::new();
        while self.order.len() > max_runs {
            if let Some(id) = self.order.pop_front()
                && let Some(old) = self.by_id.remove(&id)
            {
                evicted.push(old);
            }
        }
        evicted
    }
}

impl AppState {
    /// Concurrent requests must never share a project directory, so unique
    /// directories are forced on regardless of the config file.
    pub fn new(base_dir: PathBuf, mut config: EtlgenConfig, generator: Arc<dyn CodeGenerator>) -> Self {
        config.unique_project_dirs = true;
        Self {
            base_dir,
            config: Arc::new(config),
            generator,
            runs: Arc::new(RwLock::new(RunRegistry::default())),
        }
    }

    pub fn animation_delay(&self) -> Duration {
        self.config.animation_delay()
    }

    /// Store a run and make it the latest.
    ///
    /// Once more than `max_runs` runs are held, the oldest are dropped and their
    /// project directories and archives deleted.
    pub async fn record_run(&self, record: RunRecord) -> Arc<RunRecord> {
        let record = Arc::new(record);
        let evicted = self
            .runs
            .write()
            .await
            .insert(Arc::clone(&record), self.config.max_runs);
        for old in evicted {
            remove_run_files(&old).await;
        }
        record
    }

    pub async fn get_run(&self, run_id: &str) -> Option<Arc<RunRecord>> {
        self.runs.read().await.by_id.get(run_id).cloned()
    }

    pub async fn latest_run(&self) -> Option<Arc<RunRecord>> {
        let runs = self.runs.read().await;
        let latest = runs.order.back()?;
        runs.by_id.get(latest).cloned()
    }

    /// All retained runs, oldest first.
    pub async fn list_runs(&self) -> Vec<Arc<RunRecord>> {
        let runs = self.runs.read().await;
        runs.order
            .iter()
            .filter_map(|id| runs.by_id.get(id).cloned())
            .collect()
    }
}

async fn remove_run_files(run: &RunRecord) {
    info!(run_id = %run.run_id, "evicting run");
    let project_dir = &run.outcome.project_dir;
    if let Err(err) = tokio::fs::remove_dir_all(project_dir).await {
        warn!(error = %err, dir = %project_dir.display(), "failed to remove evicted project directory");
    }
    if let Some(archive) = &run.outcome.archive
        && let Err(err) = tokio::fs::remove_file(&archive.path).await
    {
        warn!(error = %err, archive = %archive.path.display(), "failed to remove evicted archive");
    }
}
