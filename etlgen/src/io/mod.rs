//! I/O helpers for etlgen commands.

pub mod archive;
pub mod config;
pub mod generator;
pub mod instructions;
pub mod pipeline;
pub mod process;
pub mod project;
pub mod prompt;
