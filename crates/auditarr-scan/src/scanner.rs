//! JWalk-based media file collector.

use std::path::Path;
use std::time::{Duration, Instant};

use jwalk::{Parallelism, WalkDir};
use tokio_util::sync::CancellationToken;

use auditarr_core::{MediaFile, MediaOrigin, MetadataFilter, ScanError, ScanWarning, WarningKind};

use crate::stat;

/// Files collected from one or more roots.
#[derive(Debug, Default)]
pub struct MediaScan {
    /// Regular files, in traversal order per root.
    pub files: Vec<MediaFile>,
    /// Entries that could not be read.
    pub warnings: Vec<ScanWarning>,
    /// Wall-clock time spent walking.
    pub duration: Duration,
}

impl MediaScan {
    /// Total bytes across collected files.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    fn absorb(&mut self, other: MediaScan) {
        self.files.extend(other.files);
        self.warnings.extend(other.warnings);
        self.duration += other.duration;
    }
}

/// Parallel collector for media files.
///
/// Hidden entries, directories, symlinks and metadata sidecars are skipped.
pub struct MediaScanner {
    metadata: MetadataFilter,
    threads: usize,
    cancel: CancellationToken,
}

impl MediaScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        Self {
            metadata: MetadataFilter::new(),
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

    /// Walk the library root and, when given, the download root.
    ///
    /// A missing library root is an error. A missing download root only
    /// produces a warning so the library can still be audited.
    pub fn scan_roots(
        &self,
        media_root: &Path,
        torrent_root: Option<&Path>,
    ) -> Result<MediaScan, ScanError> {
        let mut scan = self.scan(media_root, MediaOrigin::Library)?;

        if let Some(torrent_root) = torrent_root {
            match self.scan(torrent_root, MediaOrigin::Download) {
                Ok(downloads) => scan.absorb(downloads),
                Err(ScanError::Cancelled) => return Err(ScanError::Cancelled),
                Err(err) => scan.warnings.push(ScanWarning::new(
                    torrent_root,
                    err.to_string(),
                    WarningKind::ReadError,
                )),
            }
        }

        Ok(scan)
    }

    /// Walk one root, tagging every file with `origin`.
    pub fn scan(&self, root: &Path, origin: MediaOrigin) -> Result<MediaScan, ScanError> {
        let start = Instant::now();

        let root_metadata = std::fs::metadata(root).map_err(|e| ScanError::io(root, e))?;
        if !root_metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let walker = WalkDir::new(root)
            .parallelism(parallelism(self.threads))
            .skip_hidden(true)
            .follow_links(false)
            .sort(true);

        let mut scan = MediaScan::default();

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

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if self.metadata.matches(&path) {
                continue;
            }

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

            scan.files.push(
                MediaFile::new(
                    path,
                    metadata.len(),
                    stat::modified(&metadata),
                    stat::nlink(&metadata),
                )
                .with_origin(origin),
            );
        }

        scan.duration = start.elapsed();
        tracing::debug!(
            root = %root.display(),
            %origin,
            files = scan.files.len(),
            warnings = scan.warnings.len(),
            "media scan finished"
        );

        Ok(scan)
    }
}

impl Default for MediaScanner {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn parallelism(threads: usize) -> Parallelism {
    match threads {
        0 => Parallelism::RayonDefaultPool {
            busy_timeout: Duration::from_millis(100),
        },
        n => Parallelism::RayonNewPool(n),
    }
}
