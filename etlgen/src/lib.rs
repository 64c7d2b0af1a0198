//! Instruction-driven ETL code generation with best-effort artifact packaging.
//!
//! Free-form project instructions are sent to a code-generation model; the
//! returned script is written into a fresh project directory, executed, and the
//! directory is zipped with a tree preview of its contents. The crate keeps the
//! same split as the rest of the workspace:
//!
//! - **[`core`]**: Pure, deterministic logic (fence stripping, hierarchy
//!   indexing, display lines). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, zip archives, child
//!   processes, model calls). Isolated behind small functions and traits.
//!
//! [`generate`] coordinates the model call with the artifact pipeline to
//! implement the `generate` command and the web UI's generate endpoint.

pub mod core;
pub mod exit_codes;
pub mod generate;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
