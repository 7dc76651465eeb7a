// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
// Subcommands:
// - download: discover files for every capture and mirror them locally
// - crawl:    discovery only, writes the list of files that would be fetched
// - summary:  fold an existing attempt log into a summary (no network)
//
// `download` and `crawl` share the same options (RunArgs), flattened into
// each subcommand so both accept identical flags.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "capture-mirror",
    version = "0.1.0",
    about = "Mirror malware-capture datasets from HTTP directory listings",
    long_about = "capture-mirror walks the directory listings of each capture in a JSON input file, \
                  downloads the eligible files into a local mirror, and keeps a crash-safe log of every \
                  attempt so an interrupted run can simply be started again."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover and download all eligible files for every capture
    ///
    /// Example: capture-mirror download --input datasets/datasets.json --workers 10
    Download {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Discover files only and write them to <output>/all_files.csv
    ///
    /// Example: capture-mirror crawl --max-depth 5
    Crawl {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Summarize the attempt log of a previous run
    ///
    /// Example: capture-mirror summary --output datasets --json
    Summary {
        /// Output directory of the run to summarize
        #[arg(long, default_value = "datasets")]
        output: PathBuf,

        /// Print the summary as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

// Options shared by `download` and `crawl`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// JSON array of captures (Capture_URL, Capture_Name, Malware, Infection_Date)
    #[arg(long, default_value = "datasets/datasets.json")]
    pub input: PathBuf,

    /// Root directory of the local mirror; also holds the log and manifest
    #[arg(long, default_value = "datasets")]
    pub output: PathBuf,

    /// Maximum number of concurrent downloads
    #[arg(long, default_value_t = 10)]
    pub workers: usize,

    /// Maximum directory depth below each capture root
    #[arg(long, default_value_t = 20)]
    pub max_depth: usize,

    /// Per-request timeout in seconds (default: 20 for listings, 10 for files)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Allowed file extension; repeat to build the list (replaces the default list)
    #[arg(long = "ext", value_name = "EXT")]
    pub ext: Vec<String>,

    /// HTTP status code to treat as transient and retry (repeatable, e.g. 503)
    #[arg(long = "retry-status", value_name = "CODE")]
    pub retry_status: Vec<u16>,

    /// Print the final report as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
