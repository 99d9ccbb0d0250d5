//! Stat-backed link counting.

use std::path::Path;

use auditarr_core::LinkCounter;

use crate::stat;

/// Asks the filesystem for a path's link count.
///
/// Outside unix every readable file reports a count of one, so nothing is
/// ever considered protected by a second link there.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatLinkCounter;

impl LinkCounter for StatLinkCounter {
    fn link_count(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(path).ok().map(|m| stat::nlink(&m))
    }
}
