// src/mirror.rs
// =============================================================================
// The full mirror run behind `capture-mirror download`.
//
// For each capture, in input order:
//   crawl (discover files) -> download (bounded pool) -> records to the log
// Then fold the log into a summary and write download_status.json.
//
// The attempt log is opened once per run and shared by all captures, so a
// restarted run extends the history of the previous one.
// =============================================================================

use crate::attempt_log::{summarize, write_manifest, AttemptLog, LogOrigin, Summary};
use crate::captures::CaptureDescriptor;
use crate::crawl::crawl_capture;
use crate::download::{run_downloads, BatchReport};
use crate::paths::same_origin;
use crate::settings::Settings;
use anyhow::{Context, Result};
use reqwest::redirect::Policy;
use reqwest::Client;

// What happened to one capture during this run
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub name: String,
    pub files_found: usize,
    pub failed_directories: usize,
    pub downloads: BatchReport,
}

#[derive(Debug, Clone)]
pub struct MirrorReport {
    pub log_origin: LogOrigin,
    pub captures: Vec<CaptureOutcome>,
    /// Fold of the whole log, previous runs included
    pub summary: Summary,
}

impl MirrorReport {
    /// True if any task of this run ended in an error.
    pub fn has_failures(&self) -> bool {
        self.captures.iter().any(|c| c.downloads.failed > 0 || c.downloads.unsaved > 0)
    }
}

const MAX_REDIRECTS: usize = 10;

// Shared HTTP client for listings and downloads
//
// Per-request timeouts are applied at each call site; the client only
// bounds connection setup. Redirects are followed only on the host the
// request started on; a redirect elsewhere is returned as-is and ends up
// as an HTTP error.
pub fn build_client(settings: &Settings) -> reqwest::Result<Client> {
    let redirects = Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match attempt.previous().first() {
            Some(origin) if !same_origin(origin, attempt.url()) => attempt.stop(),
            _ => attempt.follow(),
        }
    });

    Client::builder()
        .connect_timeout(settings.listing_timeout.min(settings.download_timeout))
        .user_agent(concat!("capture-mirror/", env!("CARGO_PKG_VERSION")))
        .redirect(redirects)
        .build()
}

pub async fn run_mirror(settings: &Settings, captures: &[CaptureDescriptor]) -> Result<MirrorReport> {
    tokio::fs::create_dir_all(&settings.output_root)
        .await
        .with_context(|| format!("creating output directory {}", settings.output_root.display()))?;

    let log_path = settings.attempt_log_path();
    let (log, log_origin) = AttemptLog::open(&log_path)
        .await
        .with_context(|| format!("reading attempt log {}", log_path.display()))?;

    match &log_origin {
        LogOrigin::Fresh => {}
        LogOrigin::Resumed(count) => {
            progress!(settings.json_output, "📂 Loaded {} entries from {}", count, log_path.display())
        }
        LogOrigin::Corrupted(reason) => progress!(
            settings.json_output,
            "⚠️  {} is corrupted ({}); starting a fresh log",
            log_path.display(),
            reason
        ),
    }

    let client = build_client(settings).context("building HTTP client")?;

    let mut outcomes = Vec::with_capacity(captures.len());
    for capture in captures {
        progress!(settings.json_output, "\n📦 {} ({})", capture.name, capture.base_url);

        let crawl = crawl_capture(&client, capture, settings).await;
        if crawl.files.is_empty() {
            progress!(settings.json_output, "   ⚠️  No files found");
        } else {
            progress!(
                settings.json_output,
                "   📄 {} file(s) found in {} director(ies)",
                crawl.files.len(),
                crawl.directories
            );
        }

        let files_found = crawl.files.len();
        let downloads = run_downloads(&client, capture, crawl.files, settings, &log).await;

        outcomes.push(CaptureOutcome {
            name: capture.name.clone(),
            files_found,
            failed_directories: crawl.failed_directories,
            downloads,
        });
    }

    let records = log.snapshot().await;
    let summary = summarize(&records);

    let manifest_path = settings.manifest_path();
    write_manifest(&manifest_path, &summary, &records)
        .await
        .with_context(|| format!("writing manifest {}", manifest_path.display()))?;

    Ok(MirrorReport {
        log_origin,
        captures: outcomes,
        summary,
    })
}
