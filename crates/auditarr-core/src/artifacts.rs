//! File-kind tables: video, subtitle and metadata sidecar recognition.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Video container extensions (lowercase, no dot).
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts",
];

/// Subtitle extensions (lowercase, no dot).
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "vtt", "sub", "idx", "pgs"];

/// Filename globs for artwork and sidecar files that media servers and
/// managers drop next to media.
pub const METADATA_PATTERNS: &[&str] = &[
    "*-thumb.jpg",
    "*-thumb.png",
    "poster.jpg",
    "poster.png",
    "backdrop.jpg",
    "backdrop.png",
    "folder.jpg",
    "folder.png",
    "logo.png",
    "logo.svg",
    "season*-poster.jpg",
    "season*-poster.png",
    "banner.jpg",
    "landscape.jpg",
    "clearlogo.png",
    "*.nfo",
    "*.torrent",
];

/// Lowercased extension of a path, without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Whether `ext` (any case, with or without a leading dot) is a video extension.
pub fn is_video_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_lowercase();
    VIDEO_EXTENSIONS.contains(&ext.as_str())
}

/// Whether the path names a video file.
pub fn is_video_file(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether the path names a subtitle file.
pub fn is_subtitle_file(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SUBTITLE_EXTENSIONS.contains(&ext.as_str()))
}

/// Matcher for metadata sidecar filenames.
#[derive(Debug, Clone)]
pub struct MetadataFilter {
    globs: GlobSet,
}

impl MetadataFilter {
    /// Build a filter from the built-in patterns.
    pub fn new() -> Self {
        Self::with_patterns(METADATA_PATTERNS.iter().copied())
    }

    /// Build a filter from custom patterns. Invalid patterns are ignored.
    pub fn with_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }
        let globs = builder.build().unwrap_or_else(|_| GlobSet::empty());
        Self { globs }
    }

    /// Whether the file name of `path` is a metadata artifact.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.globs.is_match(Path::new(name)))
    }
}

impl Default for MetadataFilter {
    fn default() -> Self {
        Self::new()
    }
}
