// src/crawl/engine.rs
// =============================================================================
// Drives link discovery for each capture.
//
// - Every capture gets its own visited set: two captures on the same host
//   must not hide each other's directories
// - A capture with zero eligible files is a warning, not an error
// - The listing export (all_files.csv) is a flat table of everything found
// =============================================================================

use crate::captures::CaptureDescriptor;
use crate::discover::{discover_files, FileLink};
use crate::settings::Settings;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

// Discovery result for one capture
#[derive(Debug, Clone)]
pub struct CaptureCrawl {
    pub capture: CaptureDescriptor,
    pub files: Vec<FileLink>,
    /// Directory listings fetched
    pub directories: usize,
    /// Directory listings that failed (their subtrees are missing)
    pub failed_directories: usize,
}

// Walks one capture's tree
pub async fn crawl_capture(client: &Client, capture: &CaptureDescriptor, settings: &Settings) -> CaptureCrawl {
    info!("Crawling {} for {}", capture.base_url, capture.name);

    let mut visited = HashSet::new();
    let discovery = discover_files(client, &capture.base_url, &capture.name, settings, &mut visited).await;

    if discovery.files.is_empty() {
        warn!("No files found for capture: {}", capture.name);
    } else {
        info!(
            "Found {} file(s) for {} in {} director(ies)",
            discovery.files.len(),
            capture.name,
            discovery.trace.len()
        );
    }
    if !discovery.failures.is_empty() {
        warn!(
            "{}: {} director(ies) could not be listed",
            capture.name,
            discovery.failures.len()
        );
    }

    CaptureCrawl {
        capture: capture.clone(),
        files: discovery.files,
        directories: discovery.trace.len(),
        failed_directories: discovery.failures.len(),
    }
}

// Walks every capture in order
pub async fn crawl_captures(client: &Client, captures: &[CaptureDescriptor], settings: &Settings) -> Vec<CaptureCrawl> {
    let mut crawls = Vec::with_capacity(captures.len());
    for capture in captures {
        crawls.push(crawl_capture(client, capture, settings).await);
    }
    crawls
}

// One row of all_files.csv
#[derive(Debug, Serialize)]
struct ListingRow<'a> {
    #[serde(rename = "CaptureName")]
    capture_name: &'a str,
    #[serde(rename = "Malware")]
    malware: &'a str,
    #[serde(rename = "InfectionDate")]
    infection_date: &'a str,
    #[serde(rename = "FileName")]
    file_name: &'a str,
    #[serde(rename = "URL")]
    url: &'a str,
    #[serde(rename = "Path")]
    path: &'a str,
}

// Writes every discovered file to a CSV listing, returns the row count
pub fn write_listing(path: &Path, crawls: &[CaptureCrawl]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }

    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating listing {}", path.display()))?;

    let mut rows = 0;
    for crawl in crawls {
        for file in &crawl.files {
            writer.serialize(ListingRow {
                capture_name: &crawl.capture.name,
                malware: &crawl.capture.malware_label,
                infection_date: &crawl.capture.infection_date,
                file_name: &file.file_name,
                url: file.url.as_str(),
                path: file.url.path().trim_start_matches('/'),
            })?;
            rows += 1;
        }
    }

    writer.flush()?;
    Ok(rows)
}
