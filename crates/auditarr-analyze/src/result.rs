//! Output of one reconciliation pass.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use auditarr_core::{ManagerKind, MediaFile, PermissionIssue, Severity, Torrent};

use crate::classify::Classification;
use crate::suspicious::SuspicionReason;

/// A scanned file with its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedMedia {
    pub file: MediaFile,
    pub classification: Classification,
    /// Manager that claims the file, if any.
    pub manager: Option<ManagerKind>,
    /// Whether the claiming record is known (path and owner set).
    pub known: bool,
    pub reason: String,
}

/// A file flagged by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousFile {
    pub path: PathBuf,
    pub reason: SuspicionReason,
    pub size: u64,
}

/// Connection outcome for one external service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub enabled: bool,
    pub ok: bool,
    pub error: Option<String>,
}

impl ServiceStatus {
    /// A service that answered.
    pub fn connected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            ok: true,
            error: None,
        }
    }

    /// A service with no URL configured.
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
            ok: false,
            error: None,
        }
    }

    /// A service that was configured but failed.
    pub fn failed(name: impl Into<String>, error: impl ToString) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

/// Aggregate counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Scanned files outside skip prefixes.
    pub total_files: usize,
    pub healthy: usize,
    pub at_risk: usize,
    pub orphan: usize,
    pub orphaned_download: usize,
    pub suspicious: usize,
    pub unlinked_torrents: usize,
    /// Completed torrents past grace that list no files.
    pub empty_torrents: usize,
    pub permission_errors: usize,
    pub permission_warnings: usize,
    pub permission_infos: usize,
    /// Paths claimed by both managers.
    pub manager_conflicts: usize,
    /// Wall-clock time of the whole run, set by the caller.
    pub duration: Duration,
}

impl SummaryStats {
    pub(crate) fn record_classification(&mut self, classification: Classification) {
        match classification {
            Classification::Healthy => self.healthy += 1,
            Classification::AtRisk => self.at_risk += 1,
            Classification::Orphan => self.orphan += 1,
            Classification::OrphanedDownload => self.orphaned_download += 1,
        }
    }

    pub(crate) fn record_permission(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.permission_errors += 1,
            Severity::Warning => self.permission_warnings += 1,
            Severity::Info => self.permission_infos += 1,
        }
    }
}

/// Everything one run found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Classified files, in scan order.
    pub classified: Vec<ClassifiedMedia>,
    pub suspicious: Vec<SuspiciousFile>,
    /// Completed torrents with no protected or managed copy.
    pub unlinked_torrents: Vec<Torrent>,
    pub permission_issues: Vec<PermissionIssue>,
    /// Connection outcomes, set by the caller.
    pub services: Vec<ServiceStatus>,
    pub summary: SummaryStats,
}

impl AnalysisResult {
    /// Files with the given classification.
    pub fn with_classification(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &ClassifiedMedia> {
        self.classified
            .iter()
            .filter(move |m| m.classification == classification)
    }

    /// Bytes held by orphaned library files.
    pub fn orphan_size(&self) -> u64 {
        self.with_classification(Classification::Orphan)
            .map(|m| m.file.size)
            .sum()
    }

    /// Whether any library file is unmanaged or unprotected.
    pub fn has_findings(&self) -> bool {
        self.summary.orphan > 0 || self.summary.at_risk > 0
    }
}
