//! Ownership and mode records and the issues derived from them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

const S_ISGID: u32 = 0o2000;
const GROUP_WRITE: u32 = 0o020;
const WORLD_WRITE: u32 = 0o002;
const ANY_EXECUTE: u32 = 0o111;

/// Raw ownership and mode of one filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Path of the entry.
    pub path: PathBuf,
    /// Permission and special mode bits (`0o7777` mask).
    pub mode: u32,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl PermissionRecord {
    /// Create a record for a regular file.
    pub fn file(path: impl Into<PathBuf>, mode: u32, uid: u32, gid: u32) -> Self {
        Self {
            path: path.into(),
            mode: mode & 0o7777,
            uid,
            gid,
            is_dir: false,
        }
    }

    /// Create a record for a directory.
    pub fn directory(path: impl Into<PathBuf>, mode: u32, uid: u32, gid: u32) -> Self {
        Self {
            is_dir: true,
            ..Self::file(path, mode, uid, gid)
        }
    }

    /// Whether the set-group-id bit is present.
    pub fn has_sgid(&self) -> bool {
        self.mode & S_ISGID != 0
    }

    /// Whether members of the owning group may write.
    pub fn group_writable(&self) -> bool {
        self.mode & GROUP_WRITE != 0
    }

    /// Whether anyone may write.
    pub fn world_writable(&self) -> bool {
        self.mode & WORLD_WRITE != 0
    }

    /// Whether any execute bit is present.
    pub fn executable(&self) -> bool {
        self.mode & ANY_EXECUTE != 0
    }

    /// `ls -l` style rendering, e.g. `drwxrwsr-x`.
    pub fn mode_string(&self) -> String {
        const SYMBOLS: [(u32, char); 9] = [
            (0o400, 'r'),
            (0o200, 'w'),
            (0o100, 'x'),
            (0o040, 'r'),
            (0o020, 'w'),
            (0o010, 'x'),
            (0o004, 'r'),
            (0o002, 'w'),
            (0o001, 'x'),
        ];

        let mut out = String::with_capacity(10);
        out.push(if self.is_dir { 'd' } else { '-' });
        for (i, (bit, symbol)) in SYMBOLS.iter().enumerate() {
            let set = self.mode & bit != 0;
            // Group execute slot shows the setgid bit.
            if i == 5 && self.has_sgid() {
                out.push(if set { 's' } else { 'S' });
            } else {
                out.push(if set { *symbol } else { '-' });
            }
        }
        out
    }
}

/// Kind of permission deviation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueKind {
    WrongOwner,
    WrongGroup,
    NotGroupWritable,
    MissingSgid,
    NonstandardPermissions,
}

/// How serious a permission issue is.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
}

/// One detected deviation from the ownership policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionIssue {
    /// Offending path.
    pub path: PathBuf,
    /// What is wrong.
    pub kind: IssueKind,
    /// How much it matters.
    pub severity: Severity,
    /// Observed mode bits.
    pub mode: u32,
    /// Observed owner.
    pub uid: u32,
    /// Observed group.
    pub gid: u32,
    /// Human-readable remediation, including the command to run.
    pub fix_hint: String,
}

impl PermissionIssue {
    /// Create an issue for a record.
    pub fn new(
        record: &PermissionRecord,
        kind: IssueKind,
        severity: Severity,
        fix_hint: impl Into<String>,
    ) -> Self {
        Self {
            path: record.path.clone(),
            kind,
            severity,
            mode: record.mode,
            uid: record.uid,
            gid: record.gid,
            fix_hint: fix_hint.into(),
        }
    }
}
