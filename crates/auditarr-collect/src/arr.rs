//! Sonarr and Radarr v3 API collectors.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use auditarr_core::{ManagedFile, ManagerConfig, ManagerKind};

use crate::error::CollectError;
use crate::http::{Api, REQUEST_TIMEOUT};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Response of `/api/v3/system/status`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesResource {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    monitored: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeFileResource {
    id: u64,
    #[serde(default)]
    path: String,
    #[serde(default)]
    date_added: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovieResource {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    monitored: bool,
    #[serde(default = "assume_file")]
    has_file: bool,
}

fn assume_file() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovieFileResource {
    #[serde(default)]
    path: String,
    #[serde(default)]
    date_added: Option<DateTime<Utc>>,
}

impl EpisodeFileResource {
    fn into_record(self, series: &SeriesResource) -> ManagedFile {
        ManagedFile {
            monitored: series.monitored,
            imported_at: self.date_added,
            ..ManagedFile::episode(PathBuf::from(self.path), series.id, self.id)
        }
    }
}

impl MovieFileResource {
    fn into_record(self, movie: &MovieResource) -> ManagedFile {
        ManagedFile {
            monitored: movie.monitored,
            imported_at: self.date_added,
            ..ManagedFile::movie(PathBuf::from(self.path), movie.id)
        }
    }
}

/// Client for a Sonarr or Radarr instance.
#[derive(Debug, Clone)]
pub struct ArrClient {
    kind: ManagerKind,
    api: Api,
}

impl ArrClient {
    /// Create a client for `base_url`, authenticating with `api_key`.
    pub fn new(kind: ManagerKind, base_url: &str, api_key: &str) -> Result<Self, CollectError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| CollectError::Auth(format!("{kind} API key is not a valid header value")))?;
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(CollectError::Client)?;

        Ok(Self {
            kind,
            api: Api::new(base_url, client)?,
        })
    }

    /// Create a client from a manager section of the configuration.
    pub fn from_config(kind: ManagerKind, config: &ManagerConfig) -> Result<Self, CollectError> {
        Self::new(kind, &config.url, &config.api_key)
    }

    /// Abort in-flight requests when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.api.set_cancellation(token);
        self
    }

    /// Which manager this client talks to.
    pub fn kind(&self) -> ManagerKind {
        self.kind
    }

    /// Check reachability and credentials.
    pub async fn test_connection(&self) -> Result<SystemStatus, CollectError> {
        let status: SystemStatus = self.api.get_json("/api/v3/system/status", &[]).await?;
        tracing::debug!(
            manager = %self.kind,
            version = %status.version,
            "connected"
        );
        Ok(status)
    }

    /// Every file the manager has imported.
    ///
    /// Failure to list the parent entities is an error; failure for a single
    /// series or movie is logged and skipped.
    pub async fn collect(&self) -> Result<Vec<ManagedFile>, CollectError> {
        let records = match self.kind {
            ManagerKind::Sonarr => self.collect_series().await?,
            ManagerKind::Radarr => self.collect_movies().await?,
        };
        tracing::info!(
            manager = %self.kind,
            files = records.len(),
            "collected manager records"
        );
        Ok(records)
    }

    async fn collect_series(&self) -> Result<Vec<ManagedFile>, CollectError> {
        let series: Vec<SeriesResource> = self.api.get_json("/api/v3/series", &[]).await?;
        let mut records = Vec::new();

        for show in &series {
            self.api.check_cancelled()?;

            let files: Vec<EpisodeFileResource> = match self
                .api
                .get_json("/api/v3/episodefile", &[("seriesId", show.id.to_string())])
                .await
            {
                Ok(files) => files,
                Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
                Err(err) => {
                    tracing::warn!(series_id = show.id, title = %show.title, "failed to fetch episode files: {err}");
                    continue;
                }
            };

            records.extend(files.into_iter().map(|file| file.into_record(show)));
        }

        Ok(records)
    }

    async fn collect_movies(&self) -> Result<Vec<ManagedFile>, CollectError> {
        let movies: Vec<MovieResource> = self.api.get_json("/api/v3/movie", &[]).await?;
        let mut records = Vec::new();

        for movie in movies.iter().filter(|m| m.has_file) {
            self.api.check_cancelled()?;

            let files: Vec<MovieFileResource> = match self
                .api
                .get_json("/api/v3/moviefile", &[("movieId", movie.id.to_string())])
                .await
            {
                Ok(files) => files,
                Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
                Err(err) => {
                    tracing::warn!(movie_id = movie.id, title = %movie.title, "failed to fetch movie files: {err}");
                    continue;
                }
            };

            records.extend(files.into_iter().map(|file| file.into_record(movie)));
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditarr_core::ManagedBy;

    #[test]
    fn test_episode_file_decoding() {
        let series: SeriesResource =
            serde_json::from_str(r#"{"id": 12, "title": "Show", "monitored": false}"#).unwrap();
        let files: Vec<EpisodeFileResource> = serde_json::from_str(
            r#"[{
                "id": 340,
                "seriesId": 12,
                "path": "/data/media/tv/Show/Season 1/Show - S01E01.mkv",
                "size": 1234,
                "dateAdded": "2024-05-01T10:00:00Z"
            }]"#,
        )
        .unwrap();

        let record = files.into_iter().next().unwrap().into_record(&series);
        assert_eq!(
            record.owner,
            ManagedBy::Series {
                series_id: 12,
                episode_file_id: 340
            }
        );
        assert!(!record.monitored);
        assert!(record.is_known());
        assert!(record.imported_at.is_some());
    }

    #[test]
    fn test_movie_decoding() {
        let movies: Vec<MovieResource> = serde_json::from_str(
            r#"[
                {"id": 1, "title": "Film", "monitored": true, "hasFile": true},
                {"id": 2, "title": "Wanted", "monitored": true, "hasFile": false},
                {"id": 3, "title": "Legacy"}
            ]"#,
        )
        .unwrap();
        let with_files: Vec<u64> = movies.iter().filter(|m| m.has_file).map(|m| m.id).collect();
        assert_eq!(with_files, vec![1, 3]);

        let file: MovieFileResource =
            serde_json::from_str(r#"{"id": 7, "movieId": 1, "path": "/movies/Film/Film.mkv"}"#)
                .unwrap();
        let record = file.into_record(&movies[0]);
        assert_eq!(record.manager(), ManagerKind::Radarr);
        assert_eq!(record.imported_at, None);
        assert_eq!(record.path, PathBuf::from("/movies/Film/Film.mkv"));
    }

    #[test]
    fn test_client_rejects_bad_configuration() {
        assert!(matches!(
            ArrClient::new(ManagerKind::Sonarr, "sonarr:8989", "key"),
            Err(CollectError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ArrClient::new(ManagerKind::Radarr, "http://radarr:7878", "bad\nkey"),
            Err(CollectError::Auth(_))
        ));
        let client = ArrClient::new(ManagerKind::Radarr, "http://radarr:7878/", "key").unwrap();
        assert_eq!(client.kind(), ManagerKind::Radarr);
    }
}
