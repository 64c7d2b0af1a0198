//! Tool configuration stored in `etlgen.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "etlgen.toml";

/// Tool configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to the values the
/// tool has always used (`generated_project/generated_script.py`, `python`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EtlgenConfig {
    /// Name of the project directory created under the base directory.
    pub project_dir_name: String,

    /// File name the generated script is written to inside the project directory.
    pub script_file_name: String,

    /// Program (plus leading arguments) used to run the script, e.g. `["python"]`.
    pub interpreter: Vec<String>,

    /// Suffix the project directory with a timestamp and random id per run.
    pub unique_project_dirs: bool,

    /// Archive the project directory even when the generated script fails.
    pub package_on_failure: bool,

    /// Wall-clock limit for the generated script in seconds. `0` waits forever.
    pub run_timeout_secs: u64,

    /// Truncate captured script stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Delay between lines of the animated code display.
    pub animation_delay_ms: u64,

    /// Runs the web UI keeps; older runs are evicted and their files deleted.
    pub max_runs: usize,

    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorBackend {
    /// OpenAI-compatible chat-completions HTTP API.
    #[default]
    Openai,
    /// External command reading the prompt on stdin and printing code on stdout.
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub backend: GeneratorBackend,

    /// Model identifier sent with each completion request.
    pub model: String,

    /// Base URL of the chat-completions API (without `/chat/completions`).
    pub api_base: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Timeout for one model call (HTTP request or command run).
    pub request_timeout_secs: u64,

    /// Command for the `command` backend (e.g. `["llm", "-m", "gpt-4o"]`).
    pub command: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: GeneratorBackend::Openai,
            model: "gpt-4o".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 300,
            command: Vec::new(),
        }
    }
}

impl Default for EtlgenConfig {
    fn default() -> Self {
        Self {
            project_dir_name: "generated_project".to_string(),
            script_file_name: "generated_script.py".to_string(),
            interpreter: vec!["python".to_string()],
            unique_project_dirs: false,
            package_on_failure: true,
            run_timeout_secs: 600,
            output_limit_bytes: 100_000,
            animation_delay_ms: 100,
            max_runs: 20,
            generator: GeneratorConfig::default(),
        }
    }
}

impl EtlgenConfig {
    pub fn validate(&self) -> Result<()> {
        validate_file_name("project_dir_name", &self.project_dir_name)?;
        validate_file_name("script_file_name", &self.script_file_name)?;
        if self.interpreter.is_empty() || self.interpreter[0].trim().is_empty() {
            return Err(anyhow!("interpreter must be a non-empty array"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.max_runs == 0 {
            return Err(anyhow!("max_runs must be > 0"));
        }
        self.generator.validate()
    }

    /// Script timeout, or `None` when the script may run unbounded.
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }

    pub fn animation_delay(&self) -> Duration {
        Duration::from_millis(self.animation_delay_ms)
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("generator.request_timeout_secs must be > 0"));
        }
        match self.backend {
            GeneratorBackend::Openai => {
                if self.model.trim().is_empty() {
                    return Err(anyhow!("generator.model must not be empty"));
                }
                if self.api_base.trim().is_empty() {
                    return Err(anyhow!("generator.api_base must not be empty"));
                }
                if self.api_key_env.trim().is_empty() {
                    return Err(anyhow!("generator.api_key_env must not be empty"));
                }
            }
            GeneratorBackend::Command => {
                if self.command.is_empty() || self.command[0].trim().is_empty() {
                    return Err(anyhow!(
                        "generator.command must be a non-empty array for the command backend"
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Reject names that would escape or alias the base directory.
fn validate_file_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("{field} must not be empty"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(anyhow!("{field} must be a plain file name, got {name:?}"));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EtlgenConfig::default()`.
pub fn load_config(path: &Path) -> Result<EtlgenConfig> {
    if !path.exists() {
        let cfg = EtlgenConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EtlgenConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EtlgenConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
