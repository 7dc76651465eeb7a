// src/attempt_log/mod.rs
// =============================================================================
// The resumable attempt log: a durable history of every download attempt.
//
// Submodules:
// - record: DownloadRecord / DownloadStatus and their JSON shape
// - store: the single-owner log with atomic snapshot persistence
// - summary: folds the log into counts and writes the manifest
// =============================================================================

mod record;
mod store;
mod summary;

pub use record::{DownloadRecord, DownloadStatus};
pub use store::{AttemptLog, LogOrigin};
pub use summary::{summarize, write_manifest, Summary};
