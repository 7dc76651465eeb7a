// src/attempt_log/store.rs
// =============================================================================
// The durable attempt log.
//
// - One owner (AttemptLog) holds the in-memory record list behind a mutex
// - append() pushes a record and rewrites the snapshot file inside the same
//   critical section, so concurrent workers never interleave snapshot writes
// - The snapshot is written to "<file>.tmp" and renamed over "<file>", so a
//   reader (or a restarted run) sees either the old or the new snapshot,
//   never a half-written one
// - On open, an existing snapshot is loaded and extended; a snapshot that
//   fails to parse is reported and replaced by a fresh log
// =============================================================================

use super::record::DownloadRecord;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

// What open() found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOrigin {
    /// No snapshot existed
    Fresh,
    /// A snapshot with this many records was loaded
    Resumed(usize),
    /// A snapshot existed but could not be parsed; starting empty
    Corrupted(String),
}

pub struct AttemptLog {
    path: PathBuf,
    records: Mutex<Vec<DownloadRecord>>,
}

impl AttemptLog {
    // Opens the log at `path`, loading a previous snapshot if present
    //
    // Only an unreadable existing file is an error; a corrupted one is not.
    pub async fn open(path: &Path) -> io::Result<(Self, LogOrigin)> {
        let (records, origin) = match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<DownloadRecord>>(&bytes) {
                Ok(records) => {
                    info!("Loaded {} entries from attempt log {}", records.len(), path.display());
                    let count = records.len();
                    (records, LogOrigin::Resumed(count))
                }
                Err(e) => {
                    warn!("Attempt log {} is corrupted ({}); starting fresh", path.display(), e);
                    (Vec::new(), LogOrigin::Corrupted(e.to_string()))
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => (Vec::new(), LogOrigin::Fresh),
            Err(e) => return Err(e),
        };

        let log = AttemptLog {
            path: path.to_path_buf(),
            records: Mutex::new(records),
        };
        Ok((log, origin))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Adds a record and persists the whole log
    //
    // The record stays in memory even if persisting fails; the next
    // successful append writes it out.
    pub async fn append(&self, record: DownloadRecord) -> io::Result<()> {
        let mut records = self.records.lock().await;
        records.push(record);
        let bytes = serde_json::to_vec_pretty(&*records)?;
        write_atomically(&self.path, &bytes).await
    }

    /// Copy of every record so far, in append order.
    pub async fn snapshot(&self) -> Vec<DownloadRecord> {
        self.records.lock().await.clone()
    }

    /// URLs whose most recent record is downloaded or skipped.
    pub async fn completed_urls(&self) -> HashSet<String> {
        let records = self.records.lock().await;
        super::summary::latest_by_url(&records)
            .into_iter()
            .filter(|(_, record)| record.status.is_complete())
            .map(|(url, _)| url.to_string())
            .collect()
    }
}

// Writes `bytes` to `path` via a temporary sibling file and a rename
pub(crate) async fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, path).await
}
