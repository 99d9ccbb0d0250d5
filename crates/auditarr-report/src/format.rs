//! Human-readable formatting shared by the renderers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Format a byte size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Format a duration as an age string.
pub fn format_age(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else if secs < 86400 {
        format!("{} hours", secs / 3600)
    } else if secs < 2592000 {
        format!("{} days", secs / 86400)
    } else {
        format!("{} months", secs / 2592000)
    }
}

/// Age of `then` relative to `now`. Future timestamps read as zero.
pub fn age_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_age((now - then).to_std().unwrap_or_default())
}

/// Seconds with one decimal, e.g. `12.3`.
pub fn format_seconds(duration: Duration) -> String {
    format!("{:.1}", duration.as_secs_f64())
}

/// Escape characters that break markdown table cells and code spans.
pub fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('`', "\\`")
}
