//! Configuration file schema and loading.
//!
//! The configuration is a TOML document:
//!
//! ```toml
//! [paths]
//! media_root = "/srv/media"
//! torrent_root = "/srv/torrents"
//!
//! [sonarr]
//! url = "http://localhost:8989"
//! api_key = "..."
//! grace_hours = 48
//!
//! [permissions]
//! enabled = true
//! group_gid = 1000
//! allowed_uids = [1001, 1002]
//! sgid_paths = ["/srv/media"]
//!
//! [path_mappings]
//! "/data/media" = "/srv/media"
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::PathMappings;
use crate::permission::Severity;

/// Default grace period for manager-claimed files, in hours.
pub const DEFAULT_MANAGER_GRACE_HOURS: i64 = 48;

/// Default grace period for completed torrents, in hours.
pub const DEFAULT_DOWNLOAD_GRACE_HOURS: i64 = 24;

/// Path prefix the containerized services conventionally use for the library.
pub const CONTAINER_MEDIA_ROOT: &str = "/data/media";

/// Path prefix the containerized services conventionally use for downloads.
pub const CONTAINER_TORRENT_ROOT: &str = "/data/torrents";

/// Complete auditor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Local roots to scan.
    pub paths: PathsConfig,

    /// Series manager connection.
    #[serde(default)]
    pub sonarr: ManagerConfig,

    /// Movie manager connection.
    #[serde(default)]
    pub radarr: ManagerConfig,

    /// Download client connection.
    #[serde(default)]
    pub qbittorrent: DownloadClientConfig,

    /// Notification targets.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Report output.
    #[serde(default)]
    pub outputs: OutputConfig,

    /// Suspicious file detection.
    #[serde(default)]
    pub suspicious: SuspiciousConfig,

    /// Ownership policy.
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Service-visible prefix to local prefix.
    #[serde(default)]
    pub path_mappings: IndexMap<String, String>,
}

/// Local filesystem roots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the managed media library.
    #[serde(default)]
    pub media_root: PathBuf,

    /// Root of the download client's save tree (optional).
    #[serde(default)]
    pub torrent_root: Option<PathBuf>,
}

/// Connection to a Sonarr/Radarr style manager. An empty URL disables it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    /// Files claimed by this manager younger than this are not judged.
    #[serde(default = "default_manager_grace")]
    pub grace_hours: i64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            grace_hours: DEFAULT_MANAGER_GRACE_HOURS,
        }
    }
}

impl ManagerConfig {
    /// Whether a URL is configured.
    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Connection to the qBittorrent Web API. An empty URL disables it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadClientConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Torrents completed more recently than this are not judged.
    #[serde(default = "default_download_grace")]
    pub grace_hours: i64,
}

impl Default for DownloadClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            grace_hours: DEFAULT_DOWNLOAD_GRACE_HOURS,
        }
    }
}

impl DownloadClientConfig {
    /// Whether a URL is configured.
    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Notification targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Discord-compatible webhook URL. Empty disables notifications.
    #[serde(default)]
    pub discord_webhook: String,
}

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl ReportFormat {
    /// File extension for reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory reports are written to. Supports `~` and `$HOME` prefixes.
    #[serde(default)]
    pub report_dir: Option<String>,

    /// Formats to write.
    #[serde(default = "default_formats")]
    pub formats: Vec<ReportFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_dir: None,
            formats: default_formats(),
        }
    }
}

/// Suspicious file detection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuspiciousConfig {
    /// Extensions to flag. Empty means the built-in list.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Flag archive extensions too.
    #[serde(default)]
    pub flag_archives: bool,
}

/// Expected ownership policy for the library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// The shared media group.
    #[serde(default)]
    pub group_gid: u32,

    /// Users allowed to own library entries.
    #[serde(default)]
    pub allowed_uids: Vec<u32>,

    /// Directories under these prefixes must carry the setgid bit.
    #[serde(default)]
    pub sgid_paths: Vec<PathBuf>,

    /// Entries under these prefixes are neither classified nor audited.
    #[serde(default)]
    pub skip_paths: Vec<PathBuf>,

    /// Severity of `nonstandard_permissions` issues.
    #[serde(default)]
    pub nonstandard_severity: Severity,
}

fn default_manager_grace() -> i64 {
    DEFAULT_MANAGER_GRACE_HOURS
}

fn default_download_grace() -> i64 {
    DEFAULT_DOWNLOAD_GRACE_HOURS
}

fn default_formats() -> Vec<ReportFormat> {
    vec![ReportFormat::Markdown]
}

impl AuditConfig {
    /// Load, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration document without validating it.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Check required fields and value shapes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.media_root.as_os_str().is_empty() {
            return Err(ConfigError::invalid("paths.media_root", "is required"));
        }

        validate_url("sonarr.url", &self.sonarr.url)?;
        validate_url("radarr.url", &self.radarr.url)?;
        validate_url("qbittorrent.url", &self.qbittorrent.url)?;
        validate_url("notifications.discord_webhook", &self.notifications.discord_webhook)?;

        if self.permissions.enabled && self.permissions.allowed_uids.is_empty() {
            return Err(ConfigError::invalid(
                "permissions.allowed_uids",
                "must list at least one uid when permissions are enabled",
            ));
        }

        Ok(())
    }

    /// Effective path mappings.
    ///
    /// Without explicit mappings, the conventional container roots map onto the
    /// configured local roots.
    pub fn path_mappings(&self) -> PathMappings {
        if !self.path_mappings.is_empty() {
            return self.path_mappings.iter().collect();
        }

        let mut mappings = PathMappings::new();
        mappings.insert(CONTAINER_MEDIA_ROOT, &self.paths.media_root);
        if let Some(torrent_root) = &self.paths.torrent_root {
            mappings.insert(CONTAINER_TORRENT_ROOT, torrent_root);
        }
        mappings
    }

    /// Directory reports are written to, with home-relative prefixes expanded.
    pub fn report_dir(&self) -> PathBuf {
        match &self.outputs.report_dir {
            Some(dir) if !dir.trim().is_empty() => expand_home(dir),
            _ => default_report_dir(),
        }
    }
}

/// Platform default report directory.
pub fn default_report_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        PathBuf::from("/var/lib/auditarr/reports")
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|dir| dir.join("auditarr").join("reports"))
            .unwrap_or_else(|| PathBuf::from("./reports"))
    } else {
        PathBuf::from("./reports")
    }
}

/// Expand a leading `~` or `$HOME` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" || path == "$HOME" {
        Some("")
    } else {
        path.strip_prefix("~/")
            .or_else(|| path.strip_prefix("$HOME/"))
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(());
    }

    let Some((scheme, rest)) = url.split_once("://") else {
        return Err(ConfigError::invalid(field, format!("not a URL: {url}")));
    };
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::invalid(field, "must use http or https scheme"));
    }
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(ConfigError::invalid(field, "must have a host"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = AuditConfig::from_toml(
            r#"
            [paths]
            media_root = "/srv/media"
            "#,
        )
        .unwrap();

        assert_eq!(config.sonarr.grace_hours, 48);
        assert_eq!(config.radarr.grace_hours, 48);
        assert_eq!(config.qbittorrent.grace_hours, 24);
        assert_eq!(config.permissions.nonstandard_severity, Severity::Warning);
        assert_eq!(config.outputs.formats, vec![ReportFormat::Markdown]);
        assert!(!config.sonarr.is_enabled());
        config.validate().unwrap();
    }

    #[test]
    fn test_explicit_zero_grace_is_kept() {
        let config = AuditConfig::from_toml(
            r#"
            [paths]
            media_root = "/srv/media"
            [sonarr]
            url = "http://sonarr:8989"
            grace_hours = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.sonarr.grace_hours, 0);
        assert!(config.sonarr.is_enabled());
    }

    #[test]
    fn test_validate_rejects_missing_media_root() {
        let config = AuditConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "paths.media_root"));
    }

    #[test]
    fn test_validate_urls() {
        assert!(validate_url("x", "").is_ok());
        assert!(validate_url("x", "http://localhost:8989").is_ok());
        assert!(validate_url("x", "https://host/base").is_ok());
        assert!(validate_url("x", "ftp://host").is_err());
        assert!(validate_url("x", "http://").is_err());
        assert!(validate_url("x", "localhost:8989").is_err());
    }

    #[test]
    fn test_default_path_mappings() {
        let mut config = AuditConfig::default();
        config.paths.media_root = PathBuf::from("/srv/media");
        config.paths.torrent_root = Some(PathBuf::from("/srv/torrents"));

        let mappings = config.path_mappings();
        assert_eq!(mappings.len(), 2);
        assert_eq!(
            mappings.remap(Path::new("/data/media/tv/a.mkv")),
            PathBuf::from("/srv/media/tv/a.mkv")
        );
        assert_eq!(
            mappings.remap(Path::new("/data/torrents/a.mkv")),
            PathBuf::from("/srv/torrents/a.mkv")
        );
    }

    #[test]
    fn test_explicit_path_mappings_replace_defaults() {
        let config = AuditConfig::from_toml(
            r#"
            [paths]
            media_root = "/srv/media"
            [path_mappings]
            "/tv" = "/srv/media/tv"
            "#,
        )
        .unwrap();

        let mappings = config.path_mappings();
        assert_eq!(mappings.len(), 1);
        assert_eq!(
            mappings.remap(Path::new("/data/media/a.mkv")),
            PathBuf::from("/data/media/a.mkv")
        );
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/reports"), PathBuf::from("/abs/reports"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/reports"), home.join("reports"));
            assert_eq!(expand_home("$HOME/reports"), home.join("reports"));
        }
    }
}
