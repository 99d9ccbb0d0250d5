//! Ownership and mode collector.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::WalkDir;
use tokio_util::sync::CancellationToken;

use auditarr_core::{PermissionRecord, ScanError, ScanWarning, WarningKind, is_under};

use crate::scanner::parallelism;
use crate::stat;

/// Permission records collected from a root.
#[derive(Debug, Default)]
pub struct PermissionScan {
    /// One record per file and directory, root included.
    pub records: Vec<PermissionRecord>,
    /// Entries that could not be read.
    pub warnings: Vec<ScanWarning>,
}

/// Collects mode, owner and group for every entry below a root.
///
/// Subtrees under a skip prefix are pruned before they are read.
pub struct PermissionScanner {
    skip_paths: Arc<Vec<PathBuf>>,
    threads: usize,
    cancel: CancellationToken,
}

impl PermissionScanner {
    /// Create a scanner that prunes the given prefixes.
    pub fn new(skip_paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            skip_paths: Arc::new(skip_paths.into_iter().collect()),
            threads: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the walk when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Number of walker threads (0 = rayon default pool).
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    fn is_skipped(&self, path: &Path) -> bool {
        self.skip_paths.iter().any(|skip| is_under(path, skip))
    }

    /// Walk `root` and record every entry.
    pub fn scan(&self, root: &Path) -> Result<PermissionScan, ScanError> {
        let root_metadata = std::fs::metadata(root).map_err(|e| ScanError::io(root, e))?;
        if !root_metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let mut scan = PermissionScan::default();

        if cfg!(not(unix)) {
            scan.warnings.push(ScanWarning::new(
                root,
                "ownership and mode bits are not available on this platform",
                WarningKind::Unsupported,
            ));
            return Ok(scan);
        }

        if self.is_skipped(root) {
            return Ok(scan);
        }

        let skip_paths = Arc::clone(&self.skip_paths);
        let walker = WalkDir::new(root)
            .parallelism(parallelism(self.threads))
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|entry| match entry {
                    Ok(entry) => {
                        let path = entry.path();
                        !skip_paths.iter().any(|skip| is_under(&path, skip))
                    }
                    Err(_) => true,
                });
            });

        for entry_result in walker {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    scan.warnings.push(stat::walk_warning(&err));
                    continue;
                }
            };

            let file_type = entry.file_type();
            if !file_type.is_dir() && !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    scan.warnings.push(ScanWarning::new(
                        &path,
                        err.to_string(),
                        WarningKind::MetadataError,
                    ));
                    continue;
                }
            };

            let Some(owner) = stat::ownership(&metadata) else {
                continue;
            };

            let record = if file_type.is_dir() {
                PermissionRecord::directory(path, owner.mode, owner.uid, owner.gid)
            } else {
                PermissionRecord::file(path, owner.mode, owner.uid, owner.gid)
            };
            scan.records.push(record);
        }

        tracing::debug!(
            root = %root.display(),
            records = scan.records.len(),
            warnings = scan.warnings.len(),
            "permission scan finished"
        );

        Ok(scan)
    }
}
