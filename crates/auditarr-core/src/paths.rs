//! Path canonicalization and prefix remapping.
//!
//! The managers and the download client may see the filesystem under a
//! different root (for example a container mount point) than the auditor.
//! [`PathMappings`] rewrites their prefixes into local ones, and
//! [`normalize`] produces a [`PathKey`] that compares equal for paths that
//! differ only in case, redundant separators, or `.`/`..` segments.
//!
//! Case folding assumes the library lives on a filesystem where two paths that
//! differ only by case name the same file, or never coexist. That holds for the
//! deployments this tool targets but is not true on every platform.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Canonical lookup key for a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathKey(String);

impl PathKey {
    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lexically clean a path: collapse repeated separators, drop `.` segments and
/// resolve `..` against the preceding segment. Never touches the filesystem.
pub fn clean(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // `..` at the root stays at the root.
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Canonical case-folded key for a path.
pub fn normalize(path: &Path) -> PathKey {
    PathKey(clean(path).to_string_lossy().to_lowercase())
}

/// Whether `path` lies at or below `prefix`, compared by whole components.
pub fn is_under(path: &Path, prefix: &Path) -> bool {
    clean(path).starts_with(clean(prefix))
}

/// One external-prefix to local-prefix pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    /// Prefix as seen by the remote service.
    pub external: PathBuf,
    /// Equivalent prefix on the local filesystem.
    pub local: PathBuf,
}

/// Ordered table of prefix mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMappings {
    mappings: Vec<PathMapping>,
}

impl PathMappings {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping.
    pub fn insert(&mut self, external: impl AsRef<Path>, local: impl AsRef<Path>) {
        self.mappings.push(PathMapping {
            external: clean(external.as_ref()),
            local: clean(local.as_ref()),
        });
    }

    /// Number of configured mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether no mappings are configured.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Iterate the configured mappings.
    pub fn iter(&self) -> impl Iterator<Item = &PathMapping> {
        self.mappings.iter()
    }

    /// Rewrite a service-visible path into the local namespace.
    ///
    /// The longest matching external prefix wins; unmatched paths are returned
    /// cleaned but otherwise unchanged.
    pub fn remap(&self, path: &Path) -> PathBuf {
        self.rewrite(path, |m| (&m.external, &m.local))
    }

    /// Rewrite a local path into the service-visible namespace.
    pub fn remap_reverse(&self, path: &Path) -> PathBuf {
        self.rewrite(path, |m| (&m.local, &m.external))
    }

    fn rewrite<F>(&self, path: &Path, sides: F) -> PathBuf
    where
        F: Fn(&PathMapping) -> (&PathBuf, &PathBuf),
    {
        let cleaned = clean(path);

        let best = self
            .mappings
            .iter()
            .map(&sides)
            .filter_map(|(from, to)| cleaned.strip_prefix(from).ok().map(|rest| (from, to, rest)))
            .max_by_key(|(from, _, _)| from.components().count());

        match best {
            Some((_, to, rest)) if rest.as_os_str().is_empty() => to.clone(),
            Some((_, to, rest)) => to.join(rest),
            None => cleaned,
        }
    }
}

impl<K, V> FromIterator<(K, V)> for PathMappings
where
    K: AsRef<Path>,
    V: AsRef<Path>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mappings = Self::new();
        for (external, local) in iter {
            mappings.insert(external, local);
        }
        mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean(Path::new("/a//b/./c")), PathBuf::from("/a/b/c"));
        assert_eq!(clean(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(clean(Path::new("")), PathBuf::from("."));
        assert_eq!(clean(Path::new("/media/tv/")), PathBuf::from("/media/tv"));
    }

    #[test]
    fn test_normalize_case_and_separators() {
        assert_eq!(
            normalize(Path::new("/Media/TV//Show/./S01E01.mkv")),
            normalize(Path::new("/media/tv/show/S01E01.MKV"))
        );
        assert_eq!(normalize(Path::new("/A/B")).as_str(), "/a/b");
    }

    #[test]
    fn test_remap_longest_prefix() {
        let mappings: PathMappings = [
            ("/data", "/mnt/data"),
            ("/data/media", "/srv/media"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            mappings.remap(Path::new("/data/media/tv/a.mkv")),
            PathBuf::from("/srv/media/tv/a.mkv")
        );
        assert_eq!(
            mappings.remap(Path::new("/data/torrents/a.mkv")),
            PathBuf::from("/mnt/data/torrents/a.mkv")
        );
        assert_eq!(mappings.remap(Path::new("/data/media")), PathBuf::from("/srv/media"));
    }

    #[test]
    fn test_remap_component_boundary() {
        let mappings: PathMappings = [("/data/media", "/srv/media")].into_iter().collect();
        // `/data/media-old` is not under `/data/media`.
        assert_eq!(
            mappings.remap(Path::new("/data/media-old/a.mkv")),
            PathBuf::from("/data/media-old/a.mkv")
        );
    }

    #[test]
    fn test_remap_passthrough_and_reverse() {
        let mappings: PathMappings = [("/data/media", "/srv/media")].into_iter().collect();
        assert_eq!(
            mappings.remap(Path::new("/other//x.mkv")),
            PathBuf::from("/other/x.mkv")
        );
        assert_eq!(
            mappings.remap_reverse(Path::new("/srv/media/movies/x.mkv")),
            PathBuf::from("/data/media/movies/x.mkv")
        );
        assert!(PathMappings::new().is_empty());
    }

    #[test]
    fn test_is_under() {
        assert!(is_under(Path::new("/media/tv/a.mkv"), Path::new("/media/tv")));
        assert!(is_under(Path::new("/media/tv"), Path::new("/media/tv/")));
        assert!(!is_under(Path::new("/media/tv-old/a.mkv"), Path::new("/media/tv")));
    }
}
