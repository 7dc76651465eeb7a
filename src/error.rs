// src/error.rs
// =============================================================================
// Typed errors for the parts of the program that need to tell failures apart.
//
// - ConfigError: problems with the capture input file or a single capture
// - FetchError: one HTTP operation (directory page or file download) failed
//
// Application-level code (main.rs and the command handlers) uses
// anyhow::Result and only needs these types when it has to decide what
// happened, e.g. "retry this?" or "record which status?".
// =============================================================================

use thiserror::Error;

// Errors raised while loading capture descriptors
//
// The first four variants are fatal for the whole run (no usable input).
// The rest only invalidate a single capture; the run continues.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("input file not found: {0}")]
    InputNotFound(String),

    #[error("could not read input file {path}: {source}")]
    InputUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in input file {path}: {source}")]
    MalformedJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("input file {0} must contain a JSON array of capture objects")]
    NotAnArray(String),

    #[error("capture #{index}: expected a JSON object")]
    NotAnObject { index: usize },

    #[error("capture #{index}: missing or empty field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("capture #{index}: invalid Capture_URL '{url}': {reason}")]
    InvalidUrl {
        index: usize,
        url: String,
        reason: String,
    },
}

// Errors from a single HTTP operation
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure: timeout, connection refused/reset, DNS, body read
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// No response (or no next body chunk) within the per-request timeout
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The server answered, but not with 2xx
    #[error("HTTP {0}")]
    Status(u16),

    /// Writing the body to disk failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Returns true if repeating the operation might succeed.
    ///
    /// Transport failures are transient (except malformed requests, which
    /// will never succeed). HTTP statuses are completed requests and are
    /// only retried when the operator listed the code in `retry_statuses`.
    pub fn is_transient(&self, retry_statuses: &[u16]) -> bool {
        match self {
            FetchError::Transport(e) => !e.is_builder(),
            FetchError::Timeout(_) => true,
            FetchError::Status(code) => retry_statuses.contains(code),
            FetchError::Io(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_not_transient_by_default() {
        assert!(!FetchError::Status(503).is_transient(&[]));
        assert!(!FetchError::Status(404).is_transient(&[]));
    }

    #[test]
    fn test_status_transient_when_opted_in() {
        assert!(FetchError::Status(503).is_transient(&[502, 503]));
        assert!(!FetchError::Status(404).is_transient(&[502, 503]));
    }

    #[test]
    fn test_timeout_is_transient() {
        assert!(FetchError::Timeout(std::time::Duration::from_secs(10)).is_transient(&[]));
    }

    #[test]
    fn test_io_never_transient() {
        let err = FetchError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(!err.is_transient(&[]));
    }

    #[test]
    fn test_missing_field_message() {
        let err = ConfigError::MissingField { index: 3, field: "Malware" };
        assert_eq!(err.to_string(), "capture #3: missing or empty field 'Malware'");
    }
}
