// src/discover/mod.rs
// =============================================================================
// Link discovery: turns a capture's root URL into the list of files to fetch.
//
// Submodules:
// - listing: parses one directory listing page and classifies its anchors
// - walker: walks the directory tree with a work queue and a visited set
// =============================================================================

mod listing;
mod walker;

pub use listing::has_allowed_extension;
pub use walker::{discover_files, FileLink};
