// src/crawl/mod.rs
// =============================================================================
// The crawl engine: runs discovery for every capture and reports what it
// found, one visited set per capture root.
// =============================================================================

mod engine;

pub use engine::{crawl_capture, crawl_captures, write_listing, CaptureCrawl};
