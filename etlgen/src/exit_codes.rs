//! Stable exit codes for etlgen CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid input/config, a model error, or a filesystem error.
pub const INVALID: i32 = 1;
/// The generated script exited non-zero or timed out (the archive may still exist).
pub const SCRIPT_FAILED: i32 = 2;
