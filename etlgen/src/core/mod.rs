//! Deterministic, pure logic shared by the CLI and the web UI.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod fence;
pub mod hierarchy;
pub mod typewriter;
