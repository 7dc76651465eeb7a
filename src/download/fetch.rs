// src/download/fetch.rs
// =============================================================================
// Downloads one file into the local mirror.
//
// Steps:
// 1. If the destination already exists -> Skipped (no request at all)
// 2. GET the file and stream the body into "<dest>.part", chunk by chunk,
//    retrying network-level failures per the retry policy
// 3. Rename "<dest>.part" -> "<dest>" once the whole body is on disk, so
//    a file at <dest> is always complete
// 4. Turn whatever happened into a TaskOutcome (never an Err)
//
// The per-request timeout applies to getting the response headers and to
// every body chunk, not to the whole transfer, so large captures are not
// cut off as long as bytes keep arriving.
// =============================================================================

use crate::attempt_log::DownloadStatus;
use crate::error::FetchError;
use crate::retry::{retry, RetryError, RetryPolicy};
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

// Knobs a download task needs, cloned into each spawned task
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub retry_statuses: Vec<u16>,
}

// Result of one download task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub status: DownloadStatus,
    /// 0 when no HTTP response was received
    pub http_status: u16,
    pub size_bytes: u64,
    pub error: Option<String>,
}

impl TaskOutcome {
    fn io_error(message: String) -> Self {
        TaskOutcome {
            status: DownloadStatus::IoError,
            http_status: 0,
            size_bytes: 0,
            error: Some(message),
        }
    }
}

// Downloads `url` to `dest` unless `dest` already exists
pub async fn download_file(client: &Client, url: &Url, dest: &Path, options: &DownloadOptions) -> TaskOutcome {
    if let Ok(metadata) = tokio::fs::metadata(dest).await {
        return TaskOutcome {
            status: DownloadStatus::Skipped,
            http_status: 0,
            size_bytes: metadata.len(),
            error: None,
        };
    }

    if let Some(parent) = dest.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return TaskOutcome::io_error(format!("cannot create {}: {}", parent.display(), e));
        }
    }

    let part = part_path(dest);
    let result = retry(
        &options.retry,
        url.as_str(),
        |_attempt| fetch_to_file(client, url, &part, options.timeout),
        |e: &FetchError| e.is_transient(&options.retry_statuses),
    )
    .await;

    match result {
        Ok((http_status, size_bytes)) => match tokio::fs::rename(&part, dest).await {
            Ok(()) => TaskOutcome {
                status: DownloadStatus::Downloaded,
                http_status,
                size_bytes,
                error: None,
            },
            Err(e) => {
                discard(&part).await;
                TaskOutcome::io_error(format!("cannot move download into place: {}", e))
            }
        },
        Err(e) => {
            discard(&part).await;
            categorize_failure(e)
        }
    }
}

// One attempt: request, check status, stream the body to `part`
//
// Returns (HTTP status, bytes written).
async fn fetch_to_file(client: &Client, url: &Url, part: &Path, timeout: Duration) -> Result<(u16, u64), FetchError> {
    let response = tokio::time::timeout(timeout, client.get(url.clone()).send())
        .await
        .map_err(|_| FetchError::Timeout(timeout))??;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    // File::create truncates whatever an earlier attempt left behind
    let mut file = tokio::fs::File::create(part).await?;
    let mut body = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = tokio::time::timeout(timeout, body.next())
        .await
        .map_err(|_| FetchError::Timeout(timeout))?
    {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok((status.as_u16(), written))
}

// Maps the terminal error of a download to a log status
//
// - HTTP status (retried or not)       -> PermanentError(code)
// - transport failure / timeout        -> TransientError
// - local I/O failure                  -> IoError
fn categorize_failure(error: RetryError<FetchError>) -> TaskOutcome {
    let message = error.to_string();

    let (status, http_status) = match error.into_inner() {
        FetchError::Status(code) => (DownloadStatus::PermanentError { code }, code),
        FetchError::Transport(_) | FetchError::Timeout(_) => (DownloadStatus::TransientError, 0),
        FetchError::Io(_) => (DownloadStatus::IoError, 0),
    };

    TaskOutcome {
        status,
        http_status,
        size_bytes: 0,
        error: Some(message),
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn discard(part: &Path) {
    let _ = tokio::fs::remove_file(part).await;
}
