//! Backend timestamp handling.
//!
//! Instants arrive as ISO-8601 text, sometimes suffixed with a bracketed
//! zone region (`2025-11-02T10:15:42.123+09:00[Asia/Seoul]`). The suffix is
//! stripped before parsing; when parsing fails anyway, the display label
//! falls back to the positional `HH:MM:SS` substring.

use chrono::{DateTime, FixedOffset};

/// Parses a backend instant, tolerating the bracketed zone-region suffix.
pub fn parse_instant(raw: &str) -> Option<DateTime<FixedOffset>> {
    let cut = match raw.find('[') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    DateTime::parse_from_rfc3339(cut.trim()).ok()
}

/// Derives the `HH:MM:SS` display label for a raw instant, or `None` when
/// no label can be extracted at all.
pub fn time_label(raw: &str) -> Option<String> {
    if let Some(instant) = parse_instant(raw) {
        return Some(instant.format("%H:%M:%S").to_string());
    }
    positional_hms(raw)
}

// `2025-11-02T10:15:42...` puts HH:MM:SS at bytes 11..19.
fn positional_hms(raw: &str) -> Option<String> {
    let candidate = raw.get(11..19)?;
    let bytes = candidate.as_bytes();
    let digits_ok = [0usize, 1, 3, 4, 6, 7]
        .iter()
        .all(|&i| bytes[i].is_ascii_digit());
    if digits_ok && bytes[2] == b':' && bytes[5] == b':' {
        Some(candidate.to_string())
    } else {
        None
    }
}
