//! Filesystem collectors for auditarr.
//!
//! This crate walks the media library and the download tree using jwalk for
//! parallel traversal.
//!
//! # Overview
//!
//! - [`MediaScanner`] collects regular media files with size, modification
//!   time and hardlink count, tagged with the tree they came from
//! - [`PermissionScanner`] collects mode, owner and group for files and
//!   directories, pruning configured skip prefixes
//! - [`StatLinkCounter`] answers link-count queries for paths that were not
//!   part of a scan
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use auditarr_scan::MediaScanner;
//!
//! let scan = MediaScanner::new()
//!     .scan_roots(Path::new("/srv/media"), Some(Path::new("/srv/torrents")))
//!     .unwrap();
//!
//! println!("Collected {} files", scan.files.len());
//! ```

mod links;
mod permissions;
mod scanner;
mod stat;

pub use links::StatLinkCounter;
pub use permissions::{PermissionScan, PermissionScanner};
pub use scanner::{MediaScan, MediaScanner};

// Re-export core types for convenience
pub use auditarr_core::{MediaFile, MediaOrigin, PermissionRecord, ScanError, ScanWarning};
