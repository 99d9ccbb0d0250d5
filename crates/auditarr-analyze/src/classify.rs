//! Per-file health verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use auditarr_core::{ManagedFile, MediaFile};

use crate::grace::within_grace;

/// Health of a file outside its grace window.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Classification {
    /// Known to a manager and hardlinked.
    Healthy,
    /// Known to a manager but the only copy of its data.
    AtRisk,
    /// Not known to any manager.
    Orphan,
    /// A download-tree file nothing imported and nothing links to.
    OrphanedDownload,
}

impl Classification {
    /// Human-readable explanation of the verdict.
    pub fn reason(&self) -> &'static str {
        match self {
            Classification::Healthy => "Tracked by a manager and hardlinked to a download",
            Classification::AtRisk => {
                "Tracked by a manager but NOT hardlinked (no download protection)"
            }
            Classification::Orphan => "Not tracked by any manager (outside grace window)",
            Classification::OrphanedDownload => {
                "Download not imported by any manager and not hardlinked into the library"
            }
        }
    }

    /// Whether the verdict marks an untracked file.
    pub fn is_orphan(&self) -> bool {
        matches!(self, Classification::Orphan | Classification::OrphanedDownload)
    }
}

/// Outcome of judging one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The file is reported with this classification.
    Classified(Classification),
    /// Too recent to judge. Excluded from every output.
    WithinGrace,
    /// A download whose data is reachable through a library link; the library
    /// copy carries the verdict.
    Covered,
}

impl Verdict {
    /// The classification, if the file is reported.
    pub fn classification(&self) -> Option<Classification> {
        match self {
            Verdict::Classified(c) => Some(*c),
            Verdict::WithinGrace | Verdict::Covered => None,
        }
    }
}

/// Judge a scanned file against the record that claims it.
///
/// `grace_hours` is the claiming manager's window; unclaimed files get none.
pub fn classify(
    file: &MediaFile,
    record: Option<&ManagedFile>,
    grace_hours: i64,
    now: DateTime<Utc>,
) -> Verdict {
    if within_grace(Some(file.modified), now, grace_hours) {
        return Verdict::WithinGrace;
    }

    let classification = match record {
        None => Classification::Orphan,
        Some(_) if file.is_hardlinked() => Classification::Healthy,
        Some(_) => Classification::AtRisk,
    };
    Verdict::Classified(classification)
}

/// Judge a download-tree file no manager claims, using the download client's
/// grace window.
pub fn classify_download(file: &MediaFile, grace_hours: i64, now: DateTime<Utc>) -> Verdict {
    if within_grace(Some(file.modified), now, grace_hours) {
        return Verdict::WithinGrace;
    }

    if file.is_hardlinked() {
        Verdict::Covered
    } else {
        Verdict::Classified(Classification::OrphanedDownload)
    }
}
