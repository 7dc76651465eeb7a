// src/main.rs
// =============================================================================
// Entry point of capture-mirror.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging
// 3. Dispatch to the subcommand handler (download, crawl, summary)
// 4. Print the report and exit with a code that tells scripts how it went:
//    0 = everything present locally, 1 = some captures/files failed,
//    2 = the run could not start (bad input file, unwritable output, ...)
// =============================================================================

#[macro_use]
mod macros;

mod attempt_log;
mod captures;
mod cli;
mod crawl;
mod discover;
mod download;
mod error;
mod logging;
mod mirror;
mod paths;
mod retry;
mod settings;

#[cfg(test)]
mod test_server;

use anyhow::{Context, Result};
use attempt_log::{summarize, AttemptLog, LogOrigin, Summary};
use captures::{load_captures, CaptureDescriptor};
use clap::Parser;
use cli::{Cli, Commands, RunArgs};
use settings::Settings;
use std::path::Path;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let output_root = match &cli.command {
        Commands::Download { args } | Commands::Crawl { args } => args.output.clone(),
        Commands::Summary { output, .. } => output.clone(),
    };
    let _log_guard = logging::init_logging(&output_root)?;

    match cli.command {
        Commands::Download { args } => handle_download(&args).await,
        Commands::Crawl { args } => handle_crawl(&args).await,
        Commands::Summary { output, json } => handle_summary(&output, json).await,
    }
}

// Handles the 'download' subcommand
async fn handle_download(args: &RunArgs) -> Result<i32> {
    let settings = Settings::from_args(args);
    let (captures, rejected) = load_input(&settings)?;

    progress!(args.json, "🔍 Mirroring {} capture(s) into {}", captures.len(), settings.output_root.display());

    let report = mirror::run_mirror(&settings, &captures).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.summary)?);
    } else {
        println!("\n📦 This run:");
        for outcome in &report.captures {
            let mut line = format!(
                "   {}: {} found, {} downloaded, {} skipped, {} failed",
                outcome.name,
                outcome.files_found,
                outcome.downloads.downloaded,
                outcome.downloads.skipped,
                outcome.downloads.failed
            );
            if outcome.failed_directories > 0 {
                line.push_str(&format!(", {} unlisted director(ies)", outcome.failed_directories));
            }
            println!("{}", line);
        }
        print_summary(&report.summary);
        println!("\n💾 Manifest written to {}", settings.manifest_path().display());
    }

    if report.has_failures() || rejected > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'crawl' subcommand: discovery only
async fn handle_crawl(args: &RunArgs) -> Result<i32> {
    let settings = Settings::from_args(args);
    let (captures, rejected) = load_input(&settings)?;

    let client = mirror::build_client(&settings).context("building HTTP client")?;
    let crawls = crawl::crawl_captures(&client, &captures, &settings).await;

    for crawl in &crawls {
        progress!(args.json, "   {} file(s) found for {}", crawl.files.len(), crawl.capture.name);
    }

    let exit_code = crawl_exit_code(&crawls, rejected);

    let total: usize = crawls.iter().map(|c| c.files.len()).sum();
    if total == 0 {
        progress!(args.json, "⚠️  No files found across all captures");
        return Ok(exit_code);
    }

    let listing_path = settings.listing_path();
    let rows = crawl::write_listing(&listing_path, &crawls)?;
    info!("Listing written to {}", listing_path.display());

    let with_files = crawls.iter().filter(|c| !c.files.is_empty()).count();
    if args.json {
        let json = serde_json::json!({
            "total_files": rows,
            "captures_with_files": with_files,
            "listing": listing_path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("\n📊 Summary:");
        println!("   📄 Total files found: {}", rows);
        println!("   📦 Captures with files: {}", with_files);
        println!("   💾 Listing: {}", listing_path.display());
    }

    Ok(exit_code)
}

// Exit code of a crawl: 1 if a listing failed or a capture was rejected
//
// Finding no files at all is a valid outcome, not a failure.
fn crawl_exit_code(crawls: &[crawl::CaptureCrawl], rejected: usize) -> i32 {
    let failed_listings = crawls.iter().any(|c| c.failed_directories > 0);
    if failed_listings || rejected > 0 {
        1
    } else {
        0
    }
}

// Handles the 'summary' subcommand: fold an existing log, no network
async fn handle_summary(output: &Path, json: bool) -> Result<i32> {
    let log_path = settings::attempt_log_path_in(output);
    let (log, origin) = AttemptLog::open(&log_path)
        .await
        .with_context(|| format!("reading attempt log {}", log_path.display()))?;

    match origin {
        LogOrigin::Fresh => {
            progress!(json, "⚠️  No attempt log at {}", log_path.display());
            return Ok(1);
        }
        LogOrigin::Corrupted(reason) => {
            progress!(json, "⚠️  Attempt log {} is corrupted: {}", log_path.display(), reason);
            return Ok(2);
        }
        LogOrigin::Resumed(_) => {}
    }

    let summary = summarize(&log.snapshot().await);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(if summary.is_clean() { 0 } else { 1 })
}

// Loads the capture input, reporting rejected captures
//
// Returns the usable captures and how many were rejected. A missing or
// unparseable input file is fatal.
fn load_input(settings: &Settings) -> Result<(Vec<CaptureDescriptor>, usize)> {
    let loaded = load_captures(&settings.input)?;
    info!("Loaded {} capture(s) from {}", loaded.captures.len(), settings.input.display());

    for rejection in &loaded.rejected {
        error!("Skipping capture: {}", rejection);
        eprintln!("❌ Skipping capture: {}", rejection);
    }

    Ok((loaded.captures, loaded.rejected.len()))
}

// Prints the run summary as a human-readable table
fn print_summary(summary: &Summary) {
    println!("\n{:<50} {:<20} {:<12} {:>6}", "CAPTURE", "MALWARE", "INFECTED", "FILES");
    println!("{}", "=".repeat(91));

    for (name, capture) in &summary.captures {
        let name_display = if name.chars().count() > 47 {
            format!("{}...", name.chars().take(47).collect::<String>())
        } else {
            name.clone()
        };
        println!(
            "{:<50} {:<20} {:<12} {:>6}",
            name_display, capture.malware_label, capture.infection_date, capture.files
        );
    }

    println!("\n📊 Summary:");
    println!("   📋 Total: {}", summary.total_files);
    println!("   ✅ Downloaded: {}", summary.downloaded);
    println!("   ⏭️  Skipped: {}", summary.skipped);
    println!("   ❌ 404s: {}", summary.not_found);
    println!("   ⚠️  Errors: {}", summary.errors);
    if summary.errors > 0 {
        println!(
            "      (HTTP: {}, network: {}, local: {})",
            summary.permanent_errors, summary.transient_errors, summary.io_errors
        );
    }
    println!("   🔗 Files present locally: {}/{}", summary.complete_urls, summary.unique_urls);
}
