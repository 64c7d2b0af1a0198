//! Instruction file intake and the bundled sample instructions.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

/// Sample instructions offered when nothing has been uploaded.
pub const SAMPLE_INSTRUCTIONS: &str = include_str!("../../assets/Instructions.txt");
/// Download name of the sample instructions.
pub const SAMPLE_FILE_NAME: &str = "Instructions.txt";

/// Read an instructions file as UTF-8 text.
///
/// Only `.txt` files are decoded here. `.docx` uploads are recognised but must
/// be exported to plain text first.
pub fn read_instructions(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("txt") => {}
        Some("docx") => bail!(
            "{}: .docx text extraction is not supported, export the document as .txt",
            path.display()
        ),
        _ => bail!("{}: only .txt and .docx supported", path.display()),
    }

    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("decode {} as UTF-8", path.display()))?;
    validate_instructions(&text)?;
    Ok(text)
}

/// Instructions must contain something other than whitespace.
pub fn validate_instructions(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        bail!("instructions are empty");
    }
    Ok(())
}
