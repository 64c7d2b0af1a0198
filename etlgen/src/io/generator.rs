//! Code-generation backends.
//!
//! The [`CodeGenerator`] trait decouples the generation flow from the model
//! provider. The live backends call an OpenAI-compatible chat-completions API
//! or pipe the prompt into an external command. Tests use scripted generators
//! that return predetermined code without touching the network.

use std::env;
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::io::config::{GeneratorBackend, GeneratorConfig};
use crate::io::process::run_command_with_timeout;
use crate::io::prompt::render_system_prompt;

/// Turns free-form project instructions into source code.
pub trait CodeGenerator: Send + Sync {
    /// Generate code for `instructions`. Transport and service errors are returned as-is.
    fn generate(&self, instructions: &str) -> Result<String>;
}

/// Build the generator selected by `cfg.backend`.
pub fn build_generator(cfg: &GeneratorConfig) -> Result<Box<dyn CodeGenerator>> {
    cfg.validate()?;
    let system_prompt = render_system_prompt()?;
    let generator: Box<dyn CodeGenerator> = match cfg.backend {
        GeneratorBackend::Openai => Box::new(OpenAiGenerator::new(cfg.clone(), system_prompt)),
        GeneratorBackend::Command => Box::new(CommandGenerator::new(cfg.clone(), system_prompt)),
    };
    Ok(generator)
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    config: GeneratorConfig,
    system_prompt: String,
}

impl OpenAiGenerator {
    pub fn new(config: GeneratorConfig, system_prompt: String) -> Self {
        Self {
            config,
            system_prompt,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

/// Request body sent to the chat-completions API.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl CodeGenerator for OpenAiGenerator {
    #[instrument(skip_all, fields(model = %self.config.model))]
    fn generate(&self, instructions: &str) -> Result<String> {
        let api_key = env::var(&self.config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", self.config.api_key_env))?;

        // Built per call so the blocking client never lives inside an async runtime.
        let client = Client::builder()
            .timeout(self.config.request_timeout())
            .build()
            .context("build http client")?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: instructions,
                },
            ],
        };

        info!(endpoint = %self.endpoint(), "requesting completion");
        let response = client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .context("chat completion request failed")?;

        let status = response.status();
        let text = response
            .text()
            .context("read chat completion response")?;

        if !status.is_success() {
            let msg = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            warn!(status = status.as_u16(), "chat completion rejected");
            bail!("chat completion API error ({}): {msg}", status.as_u16());
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).context("parse chat completion response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no message content"))?;

        debug!(chars = content.len(), "completion received");
        Ok(content.trim().to_string())
    }
}

/// Generator that runs an external command, writing the prompt to its stdin
/// and reading code from its stdout.
pub struct CommandGenerator {
    config: GeneratorConfig,
    system_prompt: String,
}

impl CommandGenerator {
    pub fn new(config: GeneratorConfig, system_prompt: String) -> Self {
        Self {
            config,
            system_prompt,
        }
    }
}

/// Prompt text fed to command backends: system prompt, separator, instructions.
pub fn command_prompt(system_prompt: &str, instructions: &str) -> String {
    format!("{}\n\n---\n\n{}\n", system_prompt.trim(), instructions.trim())
}

impl CodeGenerator for CommandGenerator {
    #[instrument(skip_all, fields(program = ?self.config.command.first()))]
    fn generate(&self, instructions: &str) -> Result<String> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .context("generator.command must not be empty")?;
        let mut cmd = Command::new(program);
        cmd.args(args);

        let prompt = command_prompt(&self.system_prompt, instructions);
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            Some(self.config.request_timeout()),
            usize::MAX,
        )
        .with_context(|| format!("run generator command {program}"))?;

        if output.timed_out {
            bail!(
                "generator command timed out after {}s",
                self.config.request_timeout_secs
            );
        }
        if !output.status.success() {
            bail!(
                "generator command failed with status {:?}: {}",
                output.status.code(),
                output.stderr_text("generator").trim()
            );
        }
        Ok(output.stdout_text("generator").trim().to_string())
    }
}
