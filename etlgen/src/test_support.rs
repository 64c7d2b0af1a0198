//! Test-only helpers: scripted generators and `sh`-based configs.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::io::config::EtlgenConfig;
use crate::io::generator::CodeGenerator;

/// Generator that replays queued responses in order.
///
/// `Err(message)` entries are returned as generation errors. Running out of
/// responses is also an error.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always returns `code`.
    pub fn always(code: &str) -> Self {
        Self::new(vec![Ok(code.to_string()); 16])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CodeGenerator for ScriptedGenerator {
    fn generate(&self, _instructions: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .map_err(|_| anyhow!("scripted generator lock poisoned"))?
            .pop_front();
        match next {
            Some(Ok(code)) => Ok(code),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted generator has no more responses")),
        }
    }
}

/// Config that runs scripts with `sh` as `run.sh` inside `proj/`.
pub fn sh_config() -> EtlgenConfig {
    EtlgenConfig {
        project_dir_name: "proj".to_string(),
        script_file_name: "run.sh".to_string(),
        interpreter: vec!["sh".to_string()],
        run_timeout_secs: 30,
        output_limit_bytes: 10_000,
        animation_delay_ms: 0,
        ..EtlgenConfig::default()
    }
}

/// Temporary base directory for pipeline runs.
pub struct TestWorkspace {
    temp: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Path of `name` inside the workspace.
    pub fn join(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }
}
