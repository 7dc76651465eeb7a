// src/paths.rs
// =============================================================================
// URL-to-filesystem mapping for the local mirror.
//
// Layout on disk:
//   <output_root>/<sanitized capture name>/<relative path>
//
// The relative path comes from a remote server, so it is untrusted: every
// segment is checked before it is allowed to become part of a local path.
// A path that would escape the capture directory is rejected outright.
// =============================================================================

use std::path::{Path, PathBuf};
use url::Url;

// Replaces anything outside [A-Za-z0-9-_.] with '_'
//
// Example: "CTU Botnet #42" -> "CTU_Botnet__42"
pub fn sanitize_capture_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // "", "." and ".." are not usable as a directory name
    if sanitized.chars().all(|c| c == '.') {
        "_".repeat(sanitized.len().max(1))
    } else {
        sanitized
    }
}

// Canonical form of a directory URL: no query, no fragment, trailing slash
//
// Two hrefs that point at the same listing ("/a/b" and "/a/b/") must
// compare equal, otherwise the visited set cannot do its job.
pub fn canonical_dir_url(url: &Url) -> Url {
    let mut canonical = url.clone();
    canonical.set_query(None);
    canonical.set_fragment(None);
    if !canonical.path().ends_with('/') {
        let path = format!("{}/", canonical.path());
        canonical.set_path(&path);
    }
    canonical
}

// True if both URLs are served by the same host and port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

// Returns the path of `url` below the canonical directory `root`,
// or None if the URL is outside the root or contains unsafe segments.
//
// Example:
//   root = https://host/publicDatasets/CTU-1/
//   url  = https://host/publicDatasets/CTU-1/bro/conn.log
//   -> Some("bro/conn.log")
pub fn relative_path_below(root: &Url, url: &Url) -> Option<String> {
    if !same_origin(root, url) {
        return None;
    }

    let remainder = url.path().strip_prefix(root.path())?;
    if remainder.is_empty() || !remainder.split('/').all(is_safe_segment) {
        return None;
    }

    Some(remainder.to_string())
}

// Joins a relative path onto the capture's directory
//
// Re-validates every segment so nothing built here can land outside
// <output_root>/<capture dir>, whatever the caller passed in.
pub fn local_destination(output_root: &Path, capture_name: &str, relative_path: &str) -> Option<PathBuf> {
    if relative_path.is_empty() || !relative_path.split('/').all(is_safe_segment) {
        return None;
    }

    let mut path = output_root.join(sanitize_capture_name(capture_name));
    for segment in relative_path.split('/') {
        path.push(segment);
    }
    Some(path)
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.eq_ignore_ascii_case("%2e")
        && !segment.eq_ignore_ascii_case("%2e%2e")
        && !segment.contains(&['\\', '\0', ':'][..])
}
