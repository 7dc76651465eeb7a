// src/logging.rs
// =============================================================================
// Operational logging with `tracing`.
//
// Two outputs:
// - stderr: compact lines; with --json, stdout carries only the JSON
//   document and progress lines go to stderr too (see macros.rs)
// - <output_root>/mirror.log: the same events as plain text, kept across
//   runs next to the attempt log
//
// The level comes from RUST_LOG (default "info"), e.g.
//   RUST_LOG=capture_mirror=debug,reqwest=warn
// =============================================================================

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE: &str = "mirror.log";

// Installs the global subscriber
//
// The returned guard flushes the file writer when dropped; keep it alive
// until the program exits.
pub fn init_logging(output_root: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(output_root)
        .with_context(|| format!("creating log directory {}", output_root.display()))?;

    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = tracing_appender::rolling::never(output_root, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(filter());

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}
