//! Script-friendly JSON report.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use auditarr_analyze::{AnalysisResult, Classification, ClassifiedMedia, ServiceStatus};
use auditarr_core::{IssueKind, ManagerKind, Severity};

use crate::format::{age_since, format_size};

/// Top-level JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub summary: JsonSummary,
    pub connection_status: Vec<ServiceStatus>,
    pub orphaned_media: Vec<JsonFileEntry>,
    pub orphaned_downloads: Vec<JsonFileEntry>,
    pub at_risk: Vec<JsonFileEntry>,
    pub suspicious_files: Vec<JsonSuspiciousEntry>,
    pub unlinked_torrents: Vec<JsonTorrentEntry>,
    pub permission_issues: Vec<JsonPermissionEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub total_files: usize,
    pub healthy_count: usize,
    pub at_risk_count: usize,
    pub orphan_count: usize,
    pub orphaned_download_count: usize,
    pub suspicious_count: usize,
    pub unlinked_torrent_count: usize,
    pub empty_torrent_count: usize,
    pub permission_errors: usize,
    pub permission_warnings: usize,
    pub manager_conflicts: usize,
    pub total_orphan_size_bytes: u64,
    pub total_orphan_size_human: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonFileEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub size_human: String,
    pub modified_at: DateTime<Utc>,
    pub age: String,
    pub hardlinks: u64,
    pub classification: Classification,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<ManagerKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSuspiciousEntry {
    pub path: PathBuf,
    pub reason: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonTorrentEntry {
    pub path: PathBuf,
    pub name: String,
    pub hash: String,
    pub size_bytes: u64,
    pub size_human: String,
    pub completed: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonPermissionEntry {
    pub path: PathBuf,
    pub issue: IssueKind,
    pub severity: Severity,
    pub mode: String,
    pub uid: u32,
    pub gid: u32,
    pub fix_hint: String,
}

impl JsonReport {
    /// Build the document. Ages are relative to `generated_at`.
    pub fn build(result: &AnalysisResult, generated_at: DateTime<Utc>) -> Self {
        let s = &result.summary;
        let orphan_size = result.orphan_size();

        let entries = |classification: Classification| {
            let mut files: Vec<JsonFileEntry> = result
                .with_classification(classification)
                .map(|media| file_entry(media, generated_at))
                .collect();
            files.sort_by(|a, b| a.path.cmp(&b.path));
            files
        };

        let mut suspicious_files: Vec<_> = result
            .suspicious
            .iter()
            .map(|file| JsonSuspiciousEntry {
                path: file.path.clone(),
                reason: file.reason.to_string(),
                size_bytes: file.size,
            })
            .collect();
        suspicious_files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut unlinked_torrents: Vec<_> = result
            .unlinked_torrents
            .iter()
            .map(|torrent| JsonTorrentEntry {
                path: torrent.content_path(),
                name: torrent.name.clone(),
                hash: torrent.hash.clone(),
                size_bytes: torrent.size,
                size_human: format_size(torrent.size),
                completed: torrent
                    .completed_on
                    .map(|at| format!("{} ago", age_since(at, generated_at)))
                    .unwrap_or_else(|| "unknown".to_string()),
            })
            .collect();
        unlinked_torrents.sort_by(|a, b| a.path.cmp(&b.path));

        let mut permission_issues: Vec<_> = result
            .permission_issues
            .iter()
            .map(|issue| JsonPermissionEntry {
                path: issue.path.clone(),
                issue: issue.kind,
                severity: issue.severity,
                mode: format!("{:04o}", issue.mode & 0o7777),
                uid: issue.uid,
                gid: issue.gid,
                fix_hint: issue.fix_hint.clone(),
            })
            .collect();
        permission_issues.sort_by(|a, b| a.path.cmp(&b.path));

        let mut connection_status = result.services.clone();
        connection_status.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            generated_at,
            duration_seconds: s.duration.as_secs_f64(),
            summary: JsonSummary {
                total_files: s.total_files,
                healthy_count: s.healthy,
                at_risk_count: s.at_risk,
                orphan_count: s.orphan,
                orphaned_download_count: s.orphaned_download,
                suspicious_count: s.suspicious,
                unlinked_torrent_count: s.unlinked_torrents,
                empty_torrent_count: s.empty_torrents,
                permission_errors: s.permission_errors,
                permission_warnings: s.permission_warnings,
                manager_conflicts: s.manager_conflicts,
                total_orphan_size_bytes: orphan_size,
                total_orphan_size_human: format_size(orphan_size),
            },
            connection_status,
            orphaned_media: entries(Classification::Orphan),
            orphaned_downloads: entries(Classification::OrphanedDownload),
            at_risk: entries(Classification::AtRisk),
            suspicious_files,
            unlinked_torrents,
            permission_issues,
        }
    }
}

fn file_entry(media: &ClassifiedMedia, now: DateTime<Utc>) -> JsonFileEntry {
    JsonFileEntry {
        path: media.file.path.clone(),
        size_bytes: media.file.size,
        size_human: format_size(media.file.size),
        modified_at: media.file.modified,
        age: age_since(media.file.modified, now),
        hardlinks: media.file.hardlink_count,
        classification: media.classification,
        reason: media.reason.clone(),
        manager: media.manager,
    }
}

/// Render the JSON report, pretty-printed.
pub fn render_json(
    result: &AnalysisResult,
    generated_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport::build(result, generated_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditarr_core::MediaFile;

    fn classified(path: &str, size: u64, classification: Classification) -> ClassifiedMedia {
        ClassifiedMedia {
            file: MediaFile::new(path, size, Utc::now() - chrono::Duration::days(3), 1),
            classification,
            manager: None,
            known: false,
            reason: classification.reason().to_string(),
        }
    }

    #[test]
    fn test_orphans_sorted_with_total_size() {
        let mut result = AnalysisResult {
            classified: vec![
                classified("/media/z.mkv", 2048, Classification::Orphan),
                classified("/media/a.mkv", 1024, Classification::Orphan),
                classified("/media/h.mkv", 10, Classification::Healthy),
            ],
            ..Default::default()
        };
        result.summary.orphan = 2;

        let report = JsonReport::build(&result, Utc::now());
        assert_eq!(report.orphaned_media.len(), 2);
        assert_eq!(report.orphaned_media[0].path, PathBuf::from("/media/a.mkv"));
        assert_eq!(report.summary.total_orphan_size_bytes, 3072);
        assert_eq!(report.summary.total_orphan_size_human, "3 KiB");
        assert!(report.at_risk.is_empty());
    }

    #[test]
    fn test_rendered_field_names() {
        let result = AnalysisResult {
            classified: vec![classified("/dl/x.mkv", 1, Classification::OrphanedDownload)],
            ..Default::default()
        };
        let json = render_json(&result, Utc::now()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value["generated_at"].is_string());
        assert_eq!(
            value["orphaned_downloads"][0]["classification"],
            "orphaned_download"
        );
        assert!(value["orphaned_downloads"][0].get("manager").is_none());
        assert!(value["summary"]["total_orphan_size_bytes"].is_number());
        assert_eq!(value["summary"]["empty_torrent_count"], 0);
    }
}
