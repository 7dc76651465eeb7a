// src/attempt_log/summary.rs
// =============================================================================
// Folds the attempt log into the run summary and the manifest file.
//
// The log is a history: the same URL may appear several times (a failed
// attempt, then a successful one on a later run). Two folds are offered:
// - summarize(): counts every record (attempt totals, per-capture totals)
// - latest_by_url(): the most recent record per URL, i.e. the current state
// =============================================================================

use super::record::{DownloadRecord, DownloadStatus};
use super::store::write_atomically;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    #[serde(rename = "Malware")]
    pub malware_label: String,
    #[serde(rename = "Infection_Date")]
    pub infection_date: String,
    pub files: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_files: usize,
    pub downloaded: usize,
    pub skipped: usize,
    #[serde(rename = "404s")]
    pub not_found: usize,
    pub permanent_errors: usize,
    pub transient_errors: usize,
    pub io_errors: usize,
    /// Every record that is neither downloaded nor skipped
    pub errors: usize,
    /// Distinct URLs in the log
    pub unique_urls: usize,
    /// Distinct URLs whose latest record is downloaded or skipped
    pub complete_urls: usize,
    pub captures: BTreeMap<String, CaptureSummary>,
}

impl Summary {
    /// True if no record is an error of any kind.
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

// What gets written to download_status.json
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub summary: &'a Summary,
    pub details: &'a [DownloadRecord],
}

// Counts every record in the log
pub fn summarize(records: &[DownloadRecord]) -> Summary {
    let mut summary = Summary {
        total_files: records.len(),
        ..Summary::default()
    };

    for record in records {
        match record.status {
            DownloadStatus::Downloaded => summary.downloaded += 1,
            DownloadStatus::Skipped => summary.skipped += 1,
            DownloadStatus::PermanentError { code } => {
                summary.permanent_errors += 1;
                if code == 404 {
                    summary.not_found += 1;
                }
            }
            DownloadStatus::TransientError => summary.transient_errors += 1,
            DownloadStatus::IoError => summary.io_errors += 1,
        }

        let capture = summary
            .captures
            .entry(record.capture_name.clone())
            .or_insert_with(|| CaptureSummary {
                malware_label: record.malware_label.clone(),
                infection_date: record.infection_date.clone(),
                files: 0,
            });
        capture.files += 1;
    }

    summary.errors = summary.total_files - summary.downloaded - summary.skipped;

    let latest = latest_by_url(records);
    summary.unique_urls = latest.len();
    summary.complete_urls = latest.values().filter(|r| r.status.is_complete()).count();

    summary
}

// Most recent record per URL (later entries win)
pub fn latest_by_url(records: &[DownloadRecord]) -> HashMap<&str, &DownloadRecord> {
    let mut latest = HashMap::new();
    for record in records {
        latest.insert(record.url.as_str(), record);
    }
    latest
}

// Writes {"summary": ..., "details": [...]} atomically
pub async fn write_manifest(path: &Path, summary: &Summary, details: &[DownloadRecord]) -> io::Result<()> {
    let manifest = Manifest { summary, details };
    let bytes = serde_json::to_vec_pretty(&manifest)?;
    write_atomically(path, &bytes).await
}
