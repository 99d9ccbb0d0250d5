//! Report rendering and delivery for auditarr.
//!
//! - [`render_markdown`] - a human report with one section per finding type
//! - [`render_json`] - the same findings in a script-friendly document
//! - [`ReportWriter`] - writes `audit-report-<timestamp>.{md,json}` files
//! - [`DiscordNotifier`] - posts a colour-coded summary to a webhook

mod error;
pub mod format;
mod json;
mod markdown;
mod notify;
mod writer;

pub use error::ReportError;
pub use format::{format_age, format_size};
pub use json::{
    JsonFileEntry, JsonPermissionEntry, JsonReport, JsonSummary, JsonSuspiciousEntry,
    JsonTorrentEntry, render_json,
};
pub use markdown::render_markdown;
pub use notify::{COLOR_BLUE, COLOR_RED, COLOR_YELLOW, DiscordNotifier, build_payload, embed_color};
pub use writer::{ReportWriter, report_file_name};
