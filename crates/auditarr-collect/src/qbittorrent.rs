//! qBittorrent Web API v2 collector.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use auditarr_core::{DownloadClientConfig, Torrent, TorrentState};

use crate::error::CollectError;
use crate::http::{Api, REQUEST_TIMEOUT};

const LOGIN_OK: &str = "Ok.";

#[derive(Debug, Deserialize)]
struct TorrentInfo {
    hash: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    completion_on: i64,
    #[serde(default)]
    size: i64,
}

#[derive(Debug, Deserialize)]
struct TorrentContent {
    name: String,
}

impl TorrentInfo {
    fn into_torrent(self, files: Vec<PathBuf>) -> Torrent {
        Torrent {
            state: map_state(&self.state),
            completed_on: completion_time(self.completion_on),
            size: u64::try_from(self.size).unwrap_or(0),
            save_path: PathBuf::from(self.save_path),
            hash: self.hash,
            name: self.name,
            files,
        }
    }
}

/// Map a qBittorrent state string onto a lifecycle state.
///
/// Seeding, queued-for-upload and error states all count as completed.
pub fn map_state(state: &str) -> TorrentState {
    match state {
        "downloading" | "metaDL" | "forcedMetaDL" | "allocating" | "forcedDL" | "queuedDL" => {
            TorrentState::Downloading
        }
        "checkingUP" | "checkingDL" | "checkingResumeData" | "moving" => TorrentState::Checking,
        "pausedDL" | "stoppedDL" => TorrentState::Paused,
        "stalledDL" | "stalledUP" => TorrentState::Stalled,
        _ => TorrentState::Completed,
    }
}

/// qBittorrent reports `0` or `-1` for jobs that never completed.
fn completion_time(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds <= 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0)
}

/// Client for a qBittorrent instance. Authenticates with a session cookie.
#[derive(Debug, Clone)]
pub struct QbittorrentClient {
    api: Api,
    username: String,
    password: String,
}

impl QbittorrentClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self, CollectError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .build()
            .map_err(CollectError::Client)?;

        Ok(Self {
            api: Api::new(base_url, client)?,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn from_config(config: &DownloadClientConfig) -> Result<Self, CollectError> {
        Self::new(&config.url, &config.username, &config.password)
    }

    /// Abort in-flight requests when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.api.set_cancellation(token);
        self
    }

    /// Log in and keep the session cookie for later calls.
    pub async fn login(&self) -> Result<(), CollectError> {
        let body = self
            .api
            .post_form(
                "/api/v2/auth/login",
                &[
                    ("username", self.username.as_str()),
                    ("password", self.password.as_str()),
                ],
            )
            .await
            .map_err(|err| match err {
                CollectError::Status { status, .. } if status.as_u16() == 403 => {
                    CollectError::Auth("client IP is banned after too many failed logins".into())
                }
                other => other,
            })?;

        if body.trim() != LOGIN_OK {
            return Err(CollectError::Auth(format!(
                "qbittorrent rejected the credentials: {}",
                body.trim()
            )));
        }
        tracing::debug!(url = self.api.base(), "logged in to qbittorrent");
        Ok(())
    }

    /// Log in, then list every torrent with its payload files.
    ///
    /// A torrent whose file list cannot be fetched is kept with no files.
    pub async fn collect(&self) -> Result<Vec<Torrent>, CollectError> {
        self.login().await?;

        let infos: Vec<TorrentInfo> = self.api.get_json("/api/v2/torrents/info", &[]).await?;
        let mut torrents = Vec::with_capacity(infos.len());

        for info in infos {
            self.api.check_cancelled()?;

            let files = match self
                .api
                .get_json::<Vec<TorrentContent>>("/api/v2/torrents/files", &[("hash", info.hash.clone())])
                .await
            {
                Ok(contents) => contents.into_iter().map(|c| PathBuf::from(c.name)).collect(),
                Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
                Err(err) => {
                    tracing::warn!(hash = %info.hash, name = %info.name, "failed to fetch torrent files: {err}");
                    Vec::new()
                }
            };

            torrents.push(info.into_torrent(files));
        }

        tracing::info!(torrents = torrents.len(), "collected torrents");
        Ok(torrents)
    }
}
