//! Collector error types.

use thiserror::Error;

/// Errors talking to an external service.
///
/// Collector failures are never fatal to a run: the caller logs them and
/// continues with an empty collection.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The configured base URL cannot be used.
    #[error("invalid base URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request failed before a response arrived, or the body was unreadable.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Collection was cancelled.
    #[error("collection cancelled")]
    Cancelled,
}

impl CollectError {
    pub(crate) fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    /// Whether the error came from cancellation rather than the service.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CollectError::Cancelled)
    }
}
