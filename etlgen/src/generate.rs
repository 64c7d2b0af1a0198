//! Orchestration for one "analyze and generate" interaction.

use std::path::Path;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::fence::strip_code_fences;
use crate::io::config::EtlgenConfig;
use crate::io::generator::CodeGenerator;
use crate::io::instructions::validate_instructions;
use crate::io::pipeline::{PipelineOutcome, PipelineRequest, run_pipeline};

/// Result of a generate interaction.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Generated code with Markdown fences removed, exactly as written to disk.
    pub code: String,
    pub pipeline: PipelineOutcome,
}

/// Generate code for `instructions` and run it through the artifact pipeline.
///
/// Generation errors propagate before anything is written to disk. Script
/// failures are reported in the outcome, not as errors.
#[instrument(skip_all, fields(base_dir = %base_dir.display()))]
pub fn generate_project<G: CodeGenerator + ?Sized>(
    generator: &G,
    instructions: &str,
    base_dir: &Path,
    cfg: &EtlgenConfig,
) -> Result<GenerationOutcome> {
    validate_instructions(instructions)?;
    let raw = generator.generate(instructions)?;
    let code = strip_code_fences(&raw);
    info!(lines = code.lines().count(), "code skeleton ready");

    let request = PipelineRequest::from_config(base_dir, cfg);
    let pipeline = run_pipeline(&request, &code)?;
    Ok(GenerationOutcome { code, pipeline })
}
