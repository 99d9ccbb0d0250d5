//! Detection of non-media payloads by file name.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use auditarr_core::{extension_of, is_video_extension};

/// Extensions flagged when none are configured (lowercase, no dot).
pub const DEFAULT_SUSPICIOUS_EXTENSIONS: &[&str] = &[
    "exe", "msi", "bat", "cmd", "com", "scr", "ps1", "vbs", "js", "jar", "dll", "sys", "reg",
    "lnk", "pif", "apk", "dmg", "pkg", "iso", "zip", "rar", "7z", "tar", "gz",
];

/// Archive extensions, only flagged on request.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "iso"];

/// Why a file was flagged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SuspicionReason {
    /// The extension is in the suspicious set.
    SuspiciousExtension,
    /// A suspicious extension appended to a video extension, e.g. `show.mkv.exe`.
    DoubleExtension,
}

/// Flags files whose name suggests something other than media.
#[derive(Debug, Clone)]
pub struct SuspiciousDetector {
    extensions: HashSet<String>,
    flag_archives: bool,
}

impl SuspiciousDetector {
    /// Build a detector. An empty extension list selects the built-in set.
    ///
    /// Extensions are matched case-insensitively with or without a leading dot.
    pub fn new<I, S>(extensions: I, flag_archives: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: HashSet<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        if set.is_empty() {
            set = DEFAULT_SUSPICIOUS_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect();
        }

        Self {
            extensions: set,
            flag_archives,
        }
    }

    /// Whether archives are reported.
    pub fn flags_archives(&self) -> bool {
        self.flag_archives
    }

    /// Inspect a path.
    pub fn detect(&self, path: &Path) -> Option<SuspicionReason> {
        let name = path.file_name()?.to_string_lossy();
        let segments: Vec<&str> = name.split('.').collect();

        // Disguised payloads are flagged even when archives are not.
        if segments.len() > 2 {
            let last = segments[segments.len() - 1].to_lowercase();
            let penultimate = segments[segments.len() - 2];
            if self.extensions.contains(&last) && is_video_extension(penultimate) {
                return Some(SuspicionReason::DoubleExtension);
            }
        }

        let ext = extension_of(path)?;
        if !self.extensions.contains(&ext) {
            return None;
        }
        if is_archive(&ext) && !self.flag_archives {
            return None;
        }
        Some(SuspicionReason::SuspiciousExtension)
    }
}

impl Default for SuspiciousDetector {
    fn default() -> Self {
        Self::new(Vec::<String>::new(), false)
    }
}

fn is_archive(ext: &str) -> bool {
    ARCHIVE_EXTENSIONS.contains(&ext)
}
