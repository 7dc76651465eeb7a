// src/captures.rs
// =============================================================================
// Loads capture descriptors from the JSON input file.
//
// Input format: a JSON array of objects, each with the string fields
//   Capture_URL, Capture_Name, Malware, Infection_Date
//
// Failure policy:
// - The file is missing, unreadable, not JSON, or not an array -> fatal
// - One capture is missing a field or has a bad URL -> that capture is
//   rejected and reported, the others are still loaded
// =============================================================================

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use url::Url;

/// One collection session to mirror. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDescriptor {
    pub name: String,
    pub malware_label: String,
    /// Opaque, passed through to the log and manifest as-is
    pub infection_date: String,
    pub base_url: Url,
}

// One array entry as it appears in the input file
//
// Every field is optional here so that a missing one can be reported by
// name instead of failing the whole entry.
#[derive(Debug, Deserialize)]
struct RawCapture {
    #[serde(rename = "Capture_URL", default, deserialize_with = "non_blank")]
    capture_url: Option<String>,
    #[serde(rename = "Capture_Name", default, deserialize_with = "non_blank")]
    capture_name: Option<String>,
    #[serde(rename = "Malware", default, deserialize_with = "non_blank")]
    malware: Option<String>,
    #[serde(rename = "Infection_Date", default, deserialize_with = "non_blank")]
    infection_date: Option<String>,
}

// A non-string or blank value counts as missing
fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

// Result of loading the input file
#[derive(Debug, Default)]
pub struct LoadedCaptures {
    pub captures: Vec<CaptureDescriptor>,
    pub rejected: Vec<ConfigError>,
}

// Reads and validates the capture input file
//
// Returns Err only for problems that leave nothing to work with.
pub fn load_captures(path: &Path) -> Result<LoadedCaptures, ConfigError> {
    let display = path.display().to_string();

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::InputNotFound(display));
        }
        Err(source) => return Err(ConfigError::InputUnreadable { path: display, source }),
    };

    parse_captures(&text, &display)
}

// Parses the input file contents (split out so tests don't need files)
pub fn parse_captures(text: &str, source_name: &str) -> Result<LoadedCaptures, ConfigError> {
    let value: Value = serde_json::from_str(text).map_err(|source| ConfigError::MalformedJson {
        path: source_name.to_string(),
        source,
    })?;

    let entries = match value {
        Value::Array(entries) => entries,
        _ => return Err(ConfigError::NotAnArray(source_name.to_string())),
    };

    let mut loaded = LoadedCaptures::default();
    for (index, entry) in entries.iter().enumerate() {
        match capture_from_value(index, entry) {
            Ok(capture) => loaded.captures.push(capture),
            Err(e) => loaded.rejected.push(e),
        }
    }

    Ok(loaded)
}

// Validates one array entry
fn capture_from_value(index: usize, entry: &Value) -> Result<CaptureDescriptor, ConfigError> {
    let raw = RawCapture::deserialize(entry).map_err(|_| ConfigError::NotAnObject { index })?;
    let missing = |field: &'static str| ConfigError::MissingField { index, field };

    // Checked in this order: the first missing field is the one reported
    let raw_url = raw.capture_url.ok_or_else(|| missing("Capture_URL"))?;
    let name = raw.capture_name.ok_or_else(|| missing("Capture_Name"))?;
    let malware_label = raw.malware.ok_or_else(|| missing("Malware"))?;
    let infection_date = raw.infection_date.ok_or_else(|| missing("Infection_Date"))?;

    let base_url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidUrl {
        index,
        url: raw_url.clone(),
        reason: e.to_string(),
    })?;

    if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            index,
            url: raw_url,
            reason: "expected an http(s) URL with a host".to_string(),
        });
    }

    Ok(CaptureDescriptor {
        name,
        malware_label,
        infection_date,
        base_url,
    })
}
