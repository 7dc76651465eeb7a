// src/macros.rs
// =============================================================================
// Operator-facing progress output.
// =============================================================================

/// Prints one progress line.
///
/// Goes to stdout, or to stderr when stdout carries a `--json` document,
/// so `capture-mirror download --json | jq` always sees valid JSON.
///
///     progress!(settings.json_output, "📦 {} ({})", capture.name, capture.base_url);
macro_rules! progress {
    ($json:expr, $($arg:tt)*) => {{
        if $json {
            eprintln!($($arg)*);
        } else {
            println!($($arg)*);
        }
    }};
}
