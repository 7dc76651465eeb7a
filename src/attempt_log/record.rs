// src/attempt_log/record.rs
// =============================================================================
// One entry of the attempt log: what happened when we tried to fetch a file.
//
// The JSON field names (Capture_Name, Malware, URL, ...) are the ones the
// downstream dashboard and CSV tooling already read, so they are kept
// through serde renames rather than using Rust-style names on the wire.
// =============================================================================

use serde::{Deserialize, Serialize};

// Terminal outcome of one download task
//
// Serialized inline into the record as a "status" field, e.g.
//   {"status": "downloaded", ...}
//   {"status": "permanent_error", "code": 404, ...}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Body fetched and written (HTTP 2xx)
    Downloaded,
    /// Local file already existed, no request made
    Skipped,
    /// Server answered with a non-2xx status; not retried
    PermanentError { code: u16 },
    /// Network-level failure after all retries
    TransientError,
    /// Local filesystem failure (directory, write, rename)
    IoError,
}

impl DownloadStatus {
    /// Downloaded or skipped: the file is present locally.
    pub fn is_complete(&self) -> bool {
        matches!(self, DownloadStatus::Downloaded | DownloadStatus::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    #[serde(rename = "Capture_Name")]
    pub capture_name: String,
    #[serde(rename = "Malware")]
    pub malware_label: String,
    #[serde(rename = "Infection_Date")]
    pub infection_date: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "filename")]
    pub file_name: String,
    #[serde(flatten)]
    pub status: DownloadStatus,
    /// 0 when no HTTP response was received
    pub http_status: u16,
    #[serde(rename = "path")]
    pub local_path: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Human-readable failure reason, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: DownloadStatus) -> DownloadRecord {
        DownloadRecord {
            capture_name: "CTU-1".to_string(),
            malware_label: "Neris".to_string(),
            infection_date: "2011-08-10".to_string(),
            url: "https://h/CTU-1/a.csv".to_string(),
            file_name: "a.csv".to_string(),
            status,
            http_status: 404,
            local_path: "datasets/CTU-1/a.csv".to_string(),
            size_bytes: 0,
            error: None,
        }
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(record(DownloadStatus::PermanentError { code: 404 })).unwrap();
        assert_eq!(json["status"], "permanent_error");
        assert_eq!(json["code"], 404);
        assert_eq!(json["Capture_Name"], "CTU-1");
        assert_eq!(json["URL"], "https://h/CTU-1/a.csv");
        assert_eq!(json["size"], 0);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_reads_back_flattened_status() {
        let original = record(DownloadStatus::PermanentError { code: 404 });
        let text = serde_json::to_string(&original).unwrap();
        let parsed: DownloadRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_complete_statuses() {
        assert!(DownloadStatus::Downloaded.is_complete());
        assert!(DownloadStatus::Skipped.is_complete());
        assert!(!DownloadStatus::TransientError.is_complete());
        assert!(!DownloadStatus::PermanentError { code: 500 }.is_complete());
    }
}
