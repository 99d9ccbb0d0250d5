//! Media file, manager record and torrent types.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Which scanned tree a file was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaOrigin {
    /// The managed media library.
    #[default]
    Library,
    /// The download client's save tree.
    Download,
}

/// A regular file found during the filesystem scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Absolute path on the local filesystem.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Number of directory entries referencing the same inode.
    pub hardlink_count: u64,
    /// Tree the file was found in.
    pub origin: MediaOrigin,
}

impl MediaFile {
    /// Create a library file record.
    pub fn new(
        path: impl Into<PathBuf>,
        size: u64,
        modified: DateTime<Utc>,
        hardlink_count: u64,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
            hardlink_count,
            origin: MediaOrigin::Library,
        }
    }

    /// Set the origin tag.
    pub fn with_origin(mut self, origin: MediaOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Whether a second directory entry protects this file's data.
    pub fn is_hardlinked(&self) -> bool {
        self.hardlink_count > 1
    }
}

/// The automation service that owns a managed file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum ManagerKind {
    /// Episodic series manager.
    Sonarr,
    /// Movie manager.
    Radarr,
}

/// The entity a managed file belongs to. Exactly one owner per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManagedBy {
    /// An episode file of a series.
    Series { series_id: u64, episode_file_id: u64 },
    /// A movie file.
    Movie { movie_id: u64 },
}

impl ManagedBy {
    /// The manager responsible for this owner.
    pub fn manager(&self) -> ManagerKind {
        match self {
            ManagedBy::Series { .. } => ManagerKind::Sonarr,
            ManagedBy::Movie { .. } => ManagerKind::Radarr,
        }
    }

    fn owner_id(&self) -> u64 {
        match *self {
            ManagedBy::Series { series_id, .. } => series_id,
            ManagedBy::Movie { movie_id } => movie_id,
        }
    }
}

/// A file an automation service claims to have imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedFile {
    /// Path as the managing service sees it.
    pub path: PathBuf,
    /// Owning series or movie.
    pub owner: ManagedBy,
    /// `false` when the service stopped tracking updates. Still counts as known.
    pub monitored: bool,
    /// When the service imported the file, if reported.
    pub imported_at: Option<DateTime<Utc>>,
}

impl ManagedFile {
    /// Create a record for an episode file.
    pub fn episode(path: impl Into<PathBuf>, series_id: u64, episode_file_id: u64) -> Self {
        Self {
            path: path.into(),
            owner: ManagedBy::Series {
                series_id,
                episode_file_id,
            },
            monitored: true,
            imported_at: None,
        }
    }

    /// Create a record for a movie file.
    pub fn movie(path: impl Into<PathBuf>, movie_id: u64) -> Self {
        Self {
            path: path.into(),
            owner: ManagedBy::Movie { movie_id },
            monitored: true,
            imported_at: None,
        }
    }

    /// The manager that reported this record.
    pub fn manager(&self) -> ManagerKind {
        self.owner.manager()
    }

    /// A record is known when it names a path and a real owner.
    pub fn is_known(&self) -> bool {
        !self.path.as_os_str().is_empty() && self.owner.owner_id() > 0
    }
}

/// Download client job state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TorrentState {
    Downloading,
    Checking,
    Completed,
    Paused,
    Stalled,
}

/// A download client job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Torrent {
    /// Info hash.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Save path prefix, in the download client's view of the filesystem.
    pub save_path: PathBuf,
    /// Lifecycle state.
    pub state: TorrentState,
    /// Completion time. `None` until the download finishes.
    pub completed_on: Option<DateTime<Utc>>,
    /// Total payload size in bytes.
    pub size: u64,
    /// Payload files relative to `save_path`.
    pub files: Vec<PathBuf>,
}

impl Torrent {
    /// Whether the client reports the job as completed.
    pub fn is_completed(&self) -> bool {
        self.state == TorrentState::Completed
    }

    /// Absolute paths of all payload files.
    pub fn file_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|f| self.save_path.join(f))
    }

    /// Path of the torrent's top-level payload entry.
    pub fn content_path(&self) -> PathBuf {
        self.save_path.join(Path::new(&self.name))
    }
}
