//! Core types and traits for auditarr.
//!
//! This crate provides the data model shared by the collectors, the analysis
//! engine and the reporters: scanned files, manager records, torrents,
//! permission records, path canonicalization and configuration.

mod artifacts;
mod config;
mod error;
mod links;
mod media;
mod paths;
mod permission;

pub use artifacts::{
    METADATA_PATTERNS, MetadataFilter, SUBTITLE_EXTENSIONS, VIDEO_EXTENSIONS, extension_of,
    is_subtitle_file, is_video_extension, is_video_file,
};
pub use config::{
    AuditConfig, CONTAINER_MEDIA_ROOT, CONTAINER_TORRENT_ROOT, DEFAULT_DOWNLOAD_GRACE_HOURS,
    DEFAULT_MANAGER_GRACE_HOURS, DownloadClientConfig, ManagerConfig, NotificationConfig,
    OutputConfig, PathsConfig, PermissionsConfig, ReportFormat, SuspiciousConfig,
    default_report_dir, expand_home,
};
pub use error::{ConfigError, ScanError, ScanWarning, WarningKind};
pub use links::{LinkCounter, UnknownLinks};
pub use media::{
    ManagedBy, ManagedFile, ManagerKind, MediaFile, MediaOrigin, Torrent, TorrentState,
};
pub use paths::{PathKey, PathMapping, PathMappings, clean, is_under, normalize};
pub use permission::{IssueKind, PermissionIssue, PermissionRecord, Severity};
