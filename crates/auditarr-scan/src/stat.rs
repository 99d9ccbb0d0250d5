//! Cross-platform metadata helpers.

use std::fs::Metadata;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use auditarr_core::{ScanWarning, WarningKind};
use chrono::{DateTime, Utc};

/// Convert a traversal error into a non-fatal warning.
pub(crate) fn walk_warning(err: &jwalk::Error) -> ScanWarning {
    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
    match err.io_error() {
        Some(io) => ScanWarning::from_io(path, io),
        None => ScanWarning::new(path, err.to_string(), WarningKind::ReadError),
    }
}

/// Ownership and permission bits of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ownership {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

/// Last modification time, or the epoch when the platform cannot report it.
pub(crate) fn modified(metadata: &Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .unwrap_or(std::time::UNIX_EPOCH)
        .into()
}

/// Get the number of hard links from metadata.
#[cfg(unix)]
pub(crate) fn nlink(metadata: &Metadata) -> u64 {
    metadata.nlink()
}

#[cfg(not(unix))]
pub(crate) fn nlink(_metadata: &Metadata) -> u64 {
    1 // No link count outside unix
}

/// Get mode, owner and group from metadata.
#[cfg(unix)]
pub(crate) fn ownership(metadata: &Metadata) -> Option<Ownership> {
    Some(Ownership {
        mode: metadata.mode() & 0o7777,
        uid: metadata.uid(),
        gid: metadata.gid(),
    })
}

#[cfg(not(unix))]
pub(crate) fn ownership(_metadata: &Metadata) -> Option<Ownership> {
    None
}
