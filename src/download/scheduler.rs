// src/download/scheduler.rs
// =============================================================================
// Runs the downloads for one capture through a bounded worker pool.
//
// - Every file becomes its own tokio task, so downloads run in parallel on
//   the multi-threaded runtime; at most `workers` are in flight at once
//   (buffer_unordered)
// - Results are consumed in completion order by a single loop, which is
//   the only place records are appended to the attempt log
// - A task that panics is still recorded (as an I/O error); one bad file
//   never takes down the batch
// =============================================================================

use super::fetch::{download_file, DownloadOptions, TaskOutcome};
use crate::attempt_log::{AttemptLog, DownloadRecord, DownloadStatus};
use crate::captures::CaptureDescriptor;
use crate::discover::{has_allowed_extension, FileLink};
use crate::paths::local_destination;
use crate::settings::Settings;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// Per-capture download counts, aggregated in completion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Records that could not be persisted to the log file
    pub unsaved: usize,
}

// Downloads every link of one capture, appending one record per link
//
// Parameters:
//   client: shared HTTP client (cheap to clone, one per task)
//   capture: the capture the links belong to (label + date go in records)
//   links: discovered files; order does not matter
//   settings: output root, worker budget, timeouts, retry policy
//   log: the attempt log; records are appended as tasks complete
pub async fn run_downloads(
    client: &Client,
    capture: &CaptureDescriptor,
    links: Vec<FileLink>,
    settings: &Settings,
    log: &AttemptLog,
) -> BatchReport {
    let options = Arc::new(DownloadOptions {
        timeout: settings.download_timeout,
        retry: settings.retry.clone(),
        retry_statuses: settings.retry_statuses.clone(),
    });

    let links: Vec<FileLink> = links
        .into_iter()
        .filter(|link| {
            let eligible = has_allowed_extension(&link.url, &settings.allowed_extensions);
            if !eligible {
                warn!("Dropping ineligible file {}", link.url);
            }
            eligible
        })
        .collect();

    let completed = log.completed_urls().await;
    let resumed = links.iter().filter(|l| completed.contains(l.url.as_str())).count();
    if resumed > 0 {
        info!("{}: {} file(s) already completed by a previous run", capture.name, resumed);
    }

    let total = links.len();
    let tasks = links.into_iter().map(|link| {
        let client = client.clone();
        let options = options.clone();
        let dest = local_destination(&settings.output_root, &link.capture_name, &link.relative_path);

        async move {
            let Some(dest) = dest else {
                let outcome = TaskOutcome {
                    status: DownloadStatus::IoError,
                    http_status: 0,
                    size_bytes: 0,
                    error: Some(format!("unsafe relative path '{}'", link.relative_path)),
                };
                return (link, PathBuf::new(), outcome);
            };

            let handle = tokio::spawn({
                let url = link.url.clone();
                let dest = dest.clone();
                async move { download_file(&client, &url, &dest, &options).await }
            });

            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => TaskOutcome {
                    status: DownloadStatus::IoError,
                    http_status: 0,
                    size_bytes: 0,
                    error: Some(format!("download task failed: {}", e)),
                },
            };
            (link, dest, outcome)
        }
    });

    let mut results = stream::iter(tasks).buffer_unordered(settings.workers.max(1));
    let mut report = BatchReport::default();

    while let Some((link, dest, outcome)) = results.next().await {
        report.attempted += 1;
        match outcome.status {
            DownloadStatus::Downloaded => report.downloaded += 1,
            DownloadStatus::Skipped => report.skipped += 1,
            _ => report.failed += 1,
        }

        progress!(
            settings.json_output,
            "   {} [{}/{}] {} ({})",
            status_icon(&outcome.status),
            report.attempted,
            total,
            link.relative_path,
            status_label(&outcome)
        );
        match &outcome.error {
            Some(message) => warn!("{}: {}", link.url, message),
            None => debug!("{}: {:?}", link.url, outcome.status),
        }

        let record = DownloadRecord {
            capture_name: link.capture_name,
            malware_label: capture.malware_label.clone(),
            infection_date: capture.infection_date.clone(),
            url: link.url.to_string(),
            file_name: link.file_name,
            status: outcome.status,
            http_status: outcome.http_status,
            local_path: dest.display().to_string(),
            size_bytes: outcome.size_bytes,
            error: outcome.error,
        };

        if let Err(e) = log.append(record).await {
            error!("Could not persist attempt log {}: {}", log.path().display(), e);
            report.unsaved += 1;
        }
    }

    report
}

fn status_icon(status: &DownloadStatus) -> &'static str {
    match status {
        DownloadStatus::Downloaded => "✅",
        DownloadStatus::Skipped => "⏭️ ",
        DownloadStatus::PermanentError { .. } => "❌",
        DownloadStatus::TransientError => "⏱️ ",
        DownloadStatus::IoError => "💾",
    }
}

fn status_label(outcome: &TaskOutcome) -> String {
    match outcome.status {
        DownloadStatus::Downloaded => format!("downloaded, {} bytes", outcome.size_bytes),
        DownloadStatus::Skipped => "skipped, already present".to_string(),
        DownloadStatus::PermanentError { code } => format!("HTTP {}", code),
        DownloadStatus::TransientError => "network error".to_string(),
        DownloadStatus::IoError => "local I/O error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{Route, TestServer};
    use std::time::Duration;
    use url::Url;

    fn capture(server: &TestServer) -> CaptureDescriptor {
        CaptureDescriptor {
            name: "CTU Test 1".to_string(),
            malware_label: "Neris".to_string(),
            infection_date: "2011-08-10".to_string(),
            base_url: server.url("/cap/"),
        }
    }

    fn link(url: Url, relative_path: &str) -> FileLink {
        FileLink {
            file_name: relative_path.rsplit('/').next().unwrap().to_string(),
            url,
            relative_path: relative_path.to_string(),
            capture_name: "CTU Test 1".to_string(),
        }
    }

    fn settings(output_root: &std::path::Path, workers: usize) -> Settings {
        let mut settings = Settings::default();
        settings.output_root = output_root.to_path_buf();
        settings.workers = workers;
        settings.download_timeout = Duration::from_millis(500);
        settings.retry.multiplier = Duration::from_millis(1);
        settings.retry.min_wait = Duration::from_millis(1);
        settings.retry.max_wait = Duration::from_millis(5);
        settings
    }

    #[tokio::test]
    async fn test_one_record_per_link_with_isolation() {
        let mut routes = vec![
            ("/cap/missing.csv", Route::Status(404)),
            ("/cap/dead.log", Route::FailFirst(usize::MAX, Box::new(Route::Status(200)))),
        ];
        let names: Vec<String> = (0..12).map(|i| format!("/cap/f{}.csv", i)).collect();
        for name in &names {
            routes.push((name.as_str(), Route::File(name.as_bytes().to_vec())));
        }
        let server = TestServer::start(routes).await;
        let dir = tempfile::tempdir().unwrap();
        let (log, _) = AttemptLog::open(&dir.path().join("partial_log.json")).await.unwrap();

        let mut links: Vec<FileLink> = (0..12)
            .map(|i| link(server.url(&format!("/cap/f{}.csv", i)), &format!("f{}.csv", i)))
            .collect();
        links.push(link(server.url("/cap/missing.csv"), "missing.csv"));
        links.push(link(server.url("/cap/dead.log"), "dead.log"));
        links.push(link(server.url("/cap/page.php"), "page.php"));

        let report = run_downloads(&Client::new(), &capture(&server), links, &settings(dir.path(), 4), &log).await;

        assert_eq!(report.attempted, 14);
        assert_eq!(report.downloaded, 12);
        assert_eq!(report.failed, 2);
        assert_eq!(report.unsaved, 0);

        let records = log.snapshot().await;
        assert_eq!(records.len(), 14);
        assert!(records.iter().all(|r| r.file_name != "page.php"));
        assert!(records.iter().all(|r| r.malware_label == "Neris"));

        let missing = records.iter().find(|r| r.file_name == "missing.csv").unwrap();
        assert_eq!(missing.status, DownloadStatus::PermanentError { code: 404 });
        let dead = records.iter().find(|r| r.file_name == "dead.log").unwrap();
        assert_eq!(dead.status, DownloadStatus::TransientError);

        let mirrored = dir.path().join("CTU_Test_1").join("f3.csv");
        assert_eq!(std::fs::read(mirrored).unwrap(), b"/cap/f3.csv");
    }

    #[tokio::test]
    async fn test_second_pass_skips_everything() {
        let server = TestServer::start(vec![
            ("/cap/a.csv", Route::File(b"a".to_vec())),
            ("/cap/sub/b.binetflow", Route::File(b"b".to_vec())),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let (log, _) = AttemptLog::open(&dir.path().join("partial_log.json")).await.unwrap();
        let links = vec![
            link(server.url("/cap/a.csv"), "a.csv"),
            link(server.url("/cap/sub/b.binetflow"), "sub/b.binetflow"),
        ];
        let settings = settings(dir.path(), 2);

        let first = run_downloads(&Client::new(), &capture(&server), links.clone(), &settings, &log).await;
        let second = run_downloads(&Client::new(), &capture(&server), links, &settings, &log).await;

        assert_eq!(first.downloaded, 2);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.downloaded, 0);
        assert_eq!(server.hits("/cap/a.csv"), 1);
        assert_eq!(server.hits("/cap/sub/b.binetflow"), 1);
        assert_eq!(log.snapshot().await.len(), 4);
    }

    #[tokio::test]
    async fn test_unsafe_relative_path_recorded_not_fetched() {
        let server = TestServer::start(vec![("/cap/x.csv", Route::File(b"x".to_vec()))]).await;
        let dir = tempfile::tempdir().unwrap();
        let (log, _) = AttemptLog::open(&dir.path().join("partial_log.json")).await.unwrap();

        let links = vec![link(server.url("/cap/x.csv"), "../x.csv")];
        let report = run_downloads(&Client::new(), &capture(&server), links, &settings(dir.path(), 1), &log).await;

        assert_eq!(report.failed, 1);
        assert_eq!(server.hits("/cap/x.csv"), 0);
        assert_eq!(log.snapshot().await[0].status, DownloadStatus::IoError);
    }
}
