//! System prompt describing the ETL coding conventions sent with every request.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

/// One generated file of the Bronze/Silver/Gold layout.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Stage {
    pub name: &'static str,
    pub file: &'static str,
    pub task: &'static str,
}

/// Shared helpers first, then the three data-quality layers.
pub const STAGES: [Stage; 4] = [
    Stage {
        name: "common",
        file: "common.py",
        task: "Wrapper functions for reusable tasks like reading data, writing to Delta, etc.",
    },
    Stage {
        name: "bronze",
        file: "bronze.py",
        task: "Fetch, transform, and load raw data into a bronze Delta table.",
    },
    Stage {
        name: "silver",
        file: "silver.py",
        task: "Process the data from the bronze table, apply transformations, and load it into a silver Delta table.",
    },
    Stage {
        name: "gold",
        file: "gold.py",
        task: "Perform analytical queries on the silver table and display or write the results.",
    },
];

/// Render the system prompt for the code-generation model.
pub fn render_system_prompt() -> Result<String> {
    let mut env = Environment::new();
    env.add_template("system", SYSTEM_TEMPLATE)
        .context("parse system prompt template")?;
    let template = env.get_template("system")?;
    let rendered = template
        .render(context! {
            stages => STAGES,
            shared_file => STAGES[0].file,
            layer_stages => &STAGES[1..],
        })
        .context("render system prompt")?;
    Ok(rendered.trim().to_string())
}
