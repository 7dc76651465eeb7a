// src/settings.rs
// =============================================================================
// Runtime configuration for a mirror run.
//
// Every knob is a command-line flag (see cli.rs); this struct is the
// resolved form that the rest of the program reads. The defaults reproduce
// the constants the dataset scripts have always used.
// =============================================================================

use crate::cli::RunArgs;
use crate::retry::RetryPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File extensions eligible for download (matched as lowercase suffixes)
pub const DEFAULT_EXTENSIONS: [&str; 9] = [
    ".binetflow",
    ".labeled",
    ".csv",
    ".json",
    ".log",
    ".txt",
    ".conf",
    ".html",
    ".md",
];

// File names inside the output root
const ATTEMPT_LOG_FILE: &str = "partial_log.json";
const MANIFEST_FILE: &str = "download_status.json";
const LISTING_FILE: &str = "all_files.csv";

#[derive(Debug, Clone)]
pub struct Settings {
    pub input: PathBuf,
    pub output_root: PathBuf,
    /// Concurrent downloads per capture
    pub workers: usize,
    pub max_depth: usize,
    pub listing_timeout: Duration,
    pub download_timeout: Duration,
    pub allowed_extensions: Vec<String>,
    pub retry: RetryPolicy,
    /// HTTP codes that count as transient (empty = never retry on status)
    pub retry_statuses: Vec<u16>,
    /// stdout carries a JSON document; progress lines go to stderr
    pub json_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("datasets/datasets.json"),
            output_root: PathBuf::from("datasets"),
            workers: 10,
            max_depth: 20,
            listing_timeout: Duration::from_secs(20),
            download_timeout: Duration::from_secs(10),
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            retry: RetryPolicy::default(),
            retry_statuses: Vec::new(),
            json_output: false,
        }
    }
}

impl Settings {
    // Builds settings from parsed CLI arguments, keeping defaults for
    // anything the user did not specify
    pub fn from_args(args: &RunArgs) -> Self {
        let mut settings = Settings {
            input: args.input.clone(),
            output_root: args.output.clone(),
            workers: args.workers.max(1),
            max_depth: args.max_depth,
            retry_statuses: args.retry_status.clone(),
            json_output: args.json,
            ..Settings::default()
        };

        if let Some(secs) = args.timeout_secs {
            settings.listing_timeout = Duration::from_secs(secs);
            settings.download_timeout = Duration::from_secs(secs);
        }

        if !args.ext.is_empty() {
            settings.allowed_extensions = args.ext.iter().map(|e| normalize_extension(e)).collect();
        }

        settings
    }

    pub fn attempt_log_path(&self) -> PathBuf {
        attempt_log_path_in(&self.output_root)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_root.join(MANIFEST_FILE)
    }

    pub fn listing_path(&self) -> PathBuf {
        self.output_root.join(LISTING_FILE)
    }
}

// Path of the attempt log for an output root (used by the `summary` command,
// which has no full Settings)
pub fn attempt_log_path_in(output_root: &Path) -> PathBuf {
    output_root.join(ATTEMPT_LOG_FILE)
}

// "CSV" -> ".csv", ".Log" -> ".log"
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}
