use std::path::PathBuf;

use thiserror::Error;

/// Errors writing reports or delivering notifications.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report directory or file could not be written.
    #[error("failed to write report at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The JSON report could not be encoded.
    #[error("failed to encode JSON report: {0}")]
    Encode(#[from] serde_json::Error),

    /// The webhook request did not complete.
    #[error("failed to send webhook: {0}")]
    Webhook(#[source] reqwest::Error),

    /// The webhook answered with a non-success status.
    #[error("webhook returned HTTP {0}")]
    WebhookStatus(u16),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
