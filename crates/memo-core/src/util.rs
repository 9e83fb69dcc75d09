//! Shared utility functions used across multiple modules.

/// Normalize a raw tag entry by trimming surrounding whitespace.
///
/// Returns `None` when the trimmed value is empty.
pub fn normalize_tag(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Current Unix timestamp in milliseconds.
pub fn unix_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
