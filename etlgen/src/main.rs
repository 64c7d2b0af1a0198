//! Instruction-driven ETL code generator.
//!
//! Sends project instructions to a code-generation model, runs the returned
//! script in a fresh project directory and packages the directory as a zip
//! with a tree preview.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use etlgen::core::hierarchy::write_hierarchy;
use etlgen::core::typewriter::code_lines;
use etlgen::exit_codes;
use etlgen::generate::generate_project;
use etlgen::io::config::{DEFAULT_CONFIG_FILE, EtlgenConfig, load_config, write_config};
use etlgen::io::generator::build_generator;
use etlgen::io::instructions::{SAMPLE_FILE_NAME, SAMPLE_INSTRUCTIONS, read_instructions};
use etlgen::io::pipeline::{PipelineOutcome, PipelineRequest, inspect_archive, run_pipeline};
use etlgen::logging;

#[derive(Parser)]
#[command(
    name = "etlgen",
    version,
    about = "Generate, run and package ETL code from project instructions"
)]
struct Cli {
    /// Config file (missing file means defaults).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config and the sample instructions file if missing.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the sample instructions, or write them to a file.
    Sample {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate code from an instructions file, run it and package the result.
    Generate {
        /// Instructions file (.txt).
        instructions: PathBuf,
        /// Directory the project directory and archive are created in.
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,
        /// Print the code one line at a time.
        #[arg(long)]
        animate: bool,
        /// Use a per-run project directory name.
        #[arg(long)]
        unique: bool,
    },
    /// Run an existing script through the pipeline without calling the model.
    Package {
        /// Script to run and package.
        script: PathBuf,
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,
        #[arg(long)]
        unique: bool,
    },
    /// Print the directory tree of a zip archive.
    Tree { archive: PathBuf },
}

fn main() {
    logging::init();
    let _ = dotenvy::dotenv();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Sample { output } => cmd_sample(output.as_deref()),
        Command::Generate {
            instructions,
            base_dir,
            animate,
            unique,
        } => {
            let mut cfg = load_config(&cli.config)?;
            cfg.unique_project_dirs |= unique;
            cmd_generate(&cfg, &instructions, &base_dir, animate)
        }
        Command::Package {
            script,
            base_dir,
            unique,
        } => {
            let mut cfg = load_config(&cli.config)?;
            cfg.unique_project_dirs |= unique;
            cmd_package(&cfg, &script, &base_dir)
        }
        Command::Tree { archive } => cmd_tree(&archive),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if force || !config_path.exists() {
        write_config(config_path, &EtlgenConfig::default())?;
    }
    let sample_path = config_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(SAMPLE_FILE_NAME);
    if force || !sample_path.exists() {
        fs::write(&sample_path, SAMPLE_INSTRUCTIONS)
            .with_context(|| format!("write {}", sample_path.display()))?;
    }
    Ok(exit_codes::OK)
}

fn cmd_sample(output: Option<&Path>) -> Result<i32> {
    match output {
        Some(path) => {
            fs::write(path, SAMPLE_INSTRUCTIONS)
                .with_context(|| format!("write {}", path.display()))?;
            println!("Sample instructions written to {}", path.display());
        }
        None => print!("{SAMPLE_INSTRUCTIONS}"),
    }
    Ok(exit_codes::OK)
}

fn cmd_generate(
    cfg: &EtlgenConfig,
    instructions_path: &Path,
    base_dir: &Path,
    animate: bool,
) -> Result<i32> {
    let instructions = read_instructions(instructions_path)?;
    let generator = build_generator(&cfg.generator)?;
    println!("Analyzing...");
    let outcome = generate_project(generator.as_ref(), &instructions, base_dir, cfg)?;

    println!("Code skeleton ready!");
    let delay = animate.then(|| cfg.animation_delay());
    print_code(&outcome.code, delay)?;
    report_pipeline(&outcome.pipeline)
}

fn cmd_package(cfg: &EtlgenConfig, script: &Path, base_dir: &Path) -> Result<i32> {
    let text = fs::read_to_string(script).with_context(|| format!("read {}", script.display()))?;
    let request = PipelineRequest::from_config(base_dir, cfg);
    let outcome = run_pipeline(&request, &text)?;
    report_pipeline(&outcome)
}

fn cmd_tree(archive: &Path) -> Result<i32> {
    let packaged = inspect_archive(archive)?;
    println!("{} file contains:", packaged.file_name());
    let mut stdout = io::stdout().lock();
    write_hierarchy(&mut stdout, &packaged.hierarchy).context("write tree")?;
    Ok(exit_codes::OK)
}

/// Print code, optionally one line at a time with `delay` between lines.
fn print_code(code: &str, delay: Option<Duration>) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for line in code_lines(code) {
        writeln!(stdout, "{line}").context("write code")?;
        if let Some(delay) = delay {
            stdout.flush().context("flush code")?;
            thread::sleep(delay);
        }
    }
    Ok(())
}

fn report_pipeline(outcome: &PipelineOutcome) -> Result<i32> {
    let mut stdout = io::stdout().lock();
    if !outcome.execution.status.is_success() {
        writeln!(
            stdout,
            "Generated script did not complete ({:?}); see log for details.",
            outcome.execution.status
        )?;
    }
    match &outcome.archive {
        Some(archive) => {
            writeln!(stdout, "Download the generated code: {}", archive.path.display())?;
            writeln!(stdout, "Directory Structure:")?;
            writeln!(stdout, "{} file contains:", archive.file_name())?;
            write_hierarchy(&mut stdout, &archive.hierarchy).context("write tree")?;
        }
        None => writeln!(stdout, "No archive produced.")?,
    }

    if outcome.execution.status.is_success() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::SCRIPT_FAILED)
    }
}
