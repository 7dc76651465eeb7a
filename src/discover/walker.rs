// src/discover/walker.rs
// =============================================================================
// Walks a directory tree breadth-first and collects every eligible file.
//
// How it works:
// 1. Start with the (canonical) root directory in a queue at depth 0
// 2. Fetch its listing and classify each anchor
// 3. Sub-directories go to the back of the queue (depth + 1) unless they are
//    already in the visited set or the depth bound is reached
// 4. Eligible files become FileLinks
// 5. Repeat until the queue is empty
//
// Only links on the root's host and at or below the root's path are ever
// followed or reported, so the walk cannot wander off the capture.
//
// A listing that cannot be fetched is logged and skipped: its subtree
// contributes nothing, its siblings are still walked.
// =============================================================================

use super::listing::{has_allowed_extension, last_segment, parse_listing, EntryKind};
use crate::error::FetchError;
use crate::paths::{canonical_dir_url, relative_path_below, same_origin};
use crate::retry::{retry, RetryError};
use crate::settings::Settings;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A downloadable file found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    pub file_name: String,
    pub url: Url,
    /// Path below the capture root, '/'-separated, never escaping it
    pub relative_path: String,
    /// Name of the capture this file belongs to
    pub capture_name: String,
}

// Everything one walk produced
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<FileLink>,
    /// Directories fetched, in the order they were fetched
    pub trace: Vec<Url>,
    /// Directories whose listing could not be fetched, with the reason
    pub failures: Vec<(Url, String)>,
}

// A directory waiting in the queue
#[derive(Debug, Clone)]
struct PendingDir {
    url: Url,
    depth: usize,
}

// Discovers all eligible files at or below `root`
//
// Parameters:
//   client: shared HTTP client
//   root: the capture's base URL (canonicalized here)
//   capture_name: stamped on every FileLink
//   settings: depth bound, extension allow-list, retry policy
//   visited: canonical directory URLs already walked; owned by the caller
//            so one set can span a whole crawl root
pub async fn discover_files(
    client: &Client,
    root: &Url,
    capture_name: &str,
    settings: &Settings,
    visited: &mut HashSet<String>,
) -> Discovery {
    let root = canonical_dir_url(root);
    let mut discovery = Discovery::default();

    if !visited.insert(root.to_string()) {
        return discovery;
    }

    let mut queue = VecDeque::new();
    queue.push_back(PendingDir { url: root.clone(), depth: 0 });

    let mut seen_files = HashSet::new();

    while let Some(dir) = queue.pop_front() {
        debug!("Fetching listing [depth {}]: {}", dir.depth, dir.url);
        discovery.trace.push(dir.url.clone());

        let html = match fetch_listing(client, &dir.url, settings).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to fetch listing {}: {}", dir.url, e);
                discovery.failures.push((dir.url, e.to_string()));
                continue;
            }
        };

        for entry in parse_listing(&html, &dir.url) {
            if !same_origin(&root, &entry.url) {
                debug!("Skipping external link: {}", entry.url);
                continue;
            }

            match entry.kind {
                EntryKind::Directory => {
                    if dir.depth >= settings.max_depth {
                        continue;
                    }
                    let sub_dir = canonical_dir_url(&entry.url);
                    // Links back up the tree or sideways are not part of this capture
                    if !sub_dir.path().starts_with(root.path()) {
                        continue;
                    }
                    if visited.insert(sub_dir.to_string()) {
                        queue.push_back(PendingDir { url: sub_dir, depth: dir.depth + 1 });
                    }
                }
                EntryKind::File => {
                    if !has_allowed_extension(&entry.url, &settings.allowed_extensions) {
                        continue;
                    }
                    let Some(relative_path) = relative_path_below(&root, &entry.url) else {
                        debug!("Skipping file outside capture root: {}", entry.url);
                        continue;
                    };
                    // One local file per relative path: "a.csv" and "a.csv?C=raw"
                    // would otherwise race on the same destination
                    if !seen_files.insert(relative_path.clone()) {
                        continue;
                    }
                    discovery.files.push(FileLink {
                        file_name: last_segment(&entry.url).to_string(),
                        url: entry.url,
                        relative_path,
                        capture_name: capture_name.to_string(),
                    });
                }
            }
        }
    }

    discovery
}

// Fetches one listing page, retrying transport failures
async fn fetch_listing(client: &Client, url: &Url, settings: &Settings) -> Result<String, RetryError<FetchError>> {
    retry(
        &settings.retry,
        url.as_str(),
        |_attempt| fetch_listing_once(client, url, settings.listing_timeout),
        |e: &FetchError| e.is_transient(&settings.retry_statuses),
    )
    .await
}

async fn fetch_listing_once(client: &Client, url: &Url, timeout: Duration) -> Result<String, FetchError> {
    let response = client.get(url.clone()).timeout(timeout).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().as_u16()));
    }

    Ok(response.text().await?)
}
