//! Shared HTTP plumbing: base URL handling, timeouts and cancellable requests.

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::CollectError;

/// Per-request timeout for every service.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A service endpoint with a client and a cancellation token.
#[derive(Debug, Clone)]
pub(crate) struct Api {
    base: String,
    client: reqwest::Client,
    cancel: CancellationToken,
}

impl Api {
    pub(crate) fn new(base_url: &str, client: reqwest::Client) -> Result<Self, CollectError> {
        Ok(Self {
            base: check_base_url(base_url)?,
            client,
            cancel: CancellationToken::new(),
        })
    }

    pub(crate) fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    pub(crate) fn base(&self) -> &str {
        &self.base
    }

    pub(crate) fn url(&self, path: &str) -> String {
        endpoint(&self.base, path)
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), CollectError> {
        if self.cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }
        Ok(())
    }

    /// Send a request, racing it against cancellation. Non-success statuses
    /// become errors.
    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, CollectError> {
        self.check_cancelled()?;
        let response = tokio::select! {
            _ = self.cancel.cancelled() => return Err(CollectError::Cancelled),
            response = request.send() => response.map_err(|e| CollectError::http(url, e))?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// GET `path` and decode a JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CollectError> {
        let url = self.url(path);
        let request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query);
        let response = self.send(&url, request).await?;

        tokio::select! {
            _ = self.cancel.cancelled() => Err(CollectError::Cancelled),
            body = response.json::<T>() => body.map_err(|e| CollectError::http(&url, e)),
        }
    }

    /// POST an urlencoded form and return the body as text.
    pub(crate) async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<String, CollectError> {
        let url = self.url(path);
        let request = self
            .client
            .post(&url)
            .header(reqwest::header::REFERER, self.base())
            .form(form);
        let response = self.send(&url, request).await?;

        tokio::select! {
            _ = self.cancel.cancelled() => Err(CollectError::Cancelled),
            body = response.text() => body.map_err(|e| CollectError::http(&url, e)),
        }
    }
}

/// Join a base URL and an API path, tolerating trailing slashes.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Reject base URLs that are not absolute http(s) URLs.
pub(crate) fn check_base_url(url: &str) -> Result<String, CollectError> {
    let trimmed = url.trim();
    let invalid = |message: &str| CollectError::InvalidUrl {
        url: url.to_string(),
        message: message.to_string(),
    };

    let parsed = reqwest::Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
