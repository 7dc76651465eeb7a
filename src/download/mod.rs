// src/download/mod.rs
// =============================================================================
// The download side of the mirror.
//
// Submodules:
// - fetch: one file -> one TaskOutcome (skip-if-present, streaming, retry)
// - scheduler: bounded parallel execution and log appends for a capture
// =============================================================================

mod fetch;
mod scheduler;

pub use scheduler::{run_downloads, BatchReport};
