//! Hardlink counting capability.

use std::path::Path;

/// Reports how many directory entries reference a file's data.
///
/// Platforms without an inode link count supply a degraded implementation;
/// classification only ever asks whether the count exceeds one.
pub trait LinkCounter: Send + Sync {
    /// Link count of `path`, or `None` when it cannot be determined.
    fn link_count(&self, path: &Path) -> Option<u64>;
}

/// Counter that knows nothing. Callers fall back to previously scanned data.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownLinks;

impl LinkCounter for UnknownLinks {
    fn link_count(&self, _path: &Path) -> Option<u64> {
        None
    }
}
