//! Markdown report renderer.

use std::path::Path;

use chrono::{DateTime, Utc};

use auditarr_analyze::{AnalysisResult, Classification, ClassifiedMedia};
use auditarr_core::{AuditConfig, PermissionIssue, Torrent};

use crate::format::{age_since, escape_cell, format_seconds, format_size};

/// Render a full markdown report. Ages are relative to `generated_at`.
pub fn render_markdown(
    result: &AnalysisResult,
    config: &AuditConfig,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();

    out.push_str("# Media Audit Report\n\n");
    out.push_str(&format!(
        "**Generated**: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "**Duration**: {} seconds\n\n",
        format_seconds(result.summary.duration)
    ));

    summary_section(&mut out, result);
    services_section(&mut out, result);
    at_risk_section(&mut out, result, generated_at);
    file_section(
        &mut out,
        "Orphaned Media",
        "Library files no manager tracks, outside the grace window. They use disk \
         space nothing manages: manual imports, leftovers of deleted series or movies, \
         or failed imports.",
        sorted(result, Classification::Orphan),
        generated_at,
    );
    file_section(
        &mut out,
        "Orphaned Downloads",
        "Download-tree files no manager imported and no library file links to.",
        sorted(result, Classification::OrphanedDownload),
        generated_at,
    );
    suspicious_section(&mut out, result);
    torrents_section(&mut out, &result.unlinked_torrents, generated_at);
    permissions_section(&mut out, &result.permission_issues);
    configuration_section(&mut out, config);

    out
}

fn sorted(result: &AnalysisResult, classification: Classification) -> Vec<&ClassifiedMedia> {
    let mut files: Vec<_> = result.with_classification(classification).collect();
    files.sort_by(|a, b| a.file.path.cmp(&b.file.path));
    files
}

fn code(path: &Path) -> String {
    format!("`{}`", escape_cell(&path.display().to_string()))
}

fn summary_section(out: &mut String, result: &AnalysisResult) {
    let s = &result.summary;
    let permission_issues = s.permission_errors + s.permission_warnings + s.permission_infos;

    out.push_str("## Summary\n\n");
    out.push_str("| Category | Count | Description |\n");
    out.push_str("|----------|-------|-------------|\n");
    let rows = [
        ("Scanned Files", s.total_files, "Files outside skipped paths"),
        ("Healthy Media", s.healthy, "Tracked by a manager and hardlinked"),
        ("At Risk", s.at_risk, "Tracked but not hardlinked"),
        ("Orphaned", s.orphan, "Not tracked, outside the grace window"),
        (
            "Orphaned Downloads",
            s.orphaned_download,
            "Downloads nothing imported or links to",
        ),
        ("Suspicious Files", s.suspicious, "Flagged by file name"),
        (
            "Unlinked Torrents",
            s.unlinked_torrents,
            "Completed torrents without a library copy",
        ),
        ("Permission Issues", permission_issues, "Ownership or mode policy violations"),
    ];
    for (category, count, description) in rows {
        out.push_str(&format!("| {category} | {count} | {description} |\n"));
    }
    if s.orphan > 0 {
        out.push_str(&format!(
            "\nOrphaned files hold {}.\n",
            format_size(result.orphan_size())
        ));
    }
    if s.empty_torrents > 0 {
        out.push_str(&format!(
            "\n{} completed torrent(s) list no files and could not be checked.\n",
            s.empty_torrents
        ));
    }
    if s.manager_conflicts > 0 {
        out.push_str(&format!(
            "\n{} path(s) are claimed by both Sonarr and Radarr.\n",
            s.manager_conflicts
        ));
    }
    out.push('\n');
}

fn services_section(out: &mut String, result: &AnalysisResult) {
    if result.services.is_empty() {
        return;
    }
    let mut services: Vec<_> = result.services.iter().collect();
    services.sort_by(|a, b| a.name.cmp(&b.name));

    out.push_str("## Service Connections\n\n");
    out.push_str("| Service | Status | Details |\n");
    out.push_str("|---------|--------|---------|\n");
    for service in services {
        let (status, details) = match (service.enabled, service.ok) {
            (false, _) => ("Disabled", "Not configured".to_string()),
            (true, true) => ("Connected", "OK".to_string()),
            (true, false) => (
                "Failed",
                escape_cell(service.error.as_deref().unwrap_or("unknown error")),
            ),
        };
        out.push_str(&format!("| {} | {status} | {details} |\n", service.name));
    }
    out.push('\n');
}

fn at_risk_section(out: &mut String, result: &AnalysisResult, now: DateTime<Utc>) {
    let files = sorted(result, Classification::AtRisk);
    if files.is_empty() {
        return;
    }

    out.push_str("## At Risk Media\n\n");
    out.push_str(
        "Files a manager tracks that have no hardlink into the download tree. \
         They are the only copy of their data.\n\n",
    );
    out.push_str("| Path | Manager | Age |\n");
    out.push_str("|------|---------|-----|\n");
    for media in files {
        let manager = media
            .manager
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| {} | {manager} | {} |\n",
            code(&media.file.path),
            age_since(media.file.modified, now)
        ));
    }
    out.push('\n');
}

fn file_section(
    out: &mut String,
    title: &str,
    description: &str,
    files: Vec<&ClassifiedMedia>,
    now: DateTime<Utc>,
) {
    if files.is_empty() {
        return;
    }

    out.push_str(&format!("## {title}\n\n{description}\n\n"));
    out.push_str("| Path | Size | Age |\n");
    out.push_str("|------|------|-----|\n");
    for media in files {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            code(&media.file.path),
            format_size(media.file.size),
            age_since(media.file.modified, now)
        ));
    }
    out.push('\n');
}

fn suspicious_section(out: &mut String, result: &AnalysisResult) {
    if result.suspicious.is_empty() {
        return;
    }
    let mut files: Vec<_> = result.suspicious.iter().collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    out.push_str("## Suspicious Files\n\n");
    out.push_str("Executables, scripts and disguised payloads. Review before removing.\n\n");
    out.push_str("| Path | Reason |\n");
    out.push_str("|------|--------|\n");
    for file in files {
        out.push_str(&format!("| {} | {} |\n", code(&file.path), file.reason));
    }
    out.push('\n');
}

fn torrents_section(out: &mut String, torrents: &[Torrent], now: DateTime<Utc>) {
    if torrents.is_empty() {
        return;
    }
    let mut torrents: Vec<_> = torrents.iter().collect();
    torrents.sort_by_key(|t| t.content_path());

    out.push_str("## Unlinked Torrents\n\n");
    out.push_str(
        "Completed torrents with no hardlinked or managed copy in the library.\n\n",
    );
    out.push_str("| Full Path | Size | Completed |\n");
    out.push_str("|-----------|------|-----------|\n");
    for torrent in torrents {
        let completed = torrent
            .completed_on
            .map(|at| format!("{} ago", age_since(at, now)))
            .unwrap_or_else(|| "unknown".to_string());
        out.push_str(&format!(
            "| {} | {} | {completed} |\n",
            code(&torrent.content_path()),
            format_size(torrent.size)
        ));
    }
    out.push('\n');
}

fn permissions_section(out: &mut String, issues: &[PermissionIssue]) {
    if issues.is_empty() {
        return;
    }
    let mut issues: Vec<_> = issues.iter().collect();
    issues.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.path.cmp(&b.path)));

    out.push_str("## Permission Issues\n\n");
    out.push_str("| Path | Issue | Severity | Mode | Owner | Fix |\n");
    out.push_str("|------|-------|----------|------|-------|-----|\n");
    for issue in issues {
        out.push_str(&format!(
            "| {} | {} | {} | {:04o} | {}:{} | `{}` |\n",
            code(&issue.path),
            issue.kind,
            issue.severity,
            issue.mode & 0o7777,
            issue.uid,
            issue.gid,
            escape_cell(&issue.fix_hint)
        ));
    }
    out.push('\n');
}

fn configuration_section(out: &mut String, config: &AuditConfig) {
    out.push_str("## Configuration\n\n");
    out.push_str(&format!("- Sonarr Grace: {} hours\n", config.sonarr.grace_hours));
    out.push_str(&format!("- Radarr Grace: {} hours\n", config.radarr.grace_hours));
    out.push_str(&format!(
        "- qBittorrent Grace: {} hours\n",
        config.qbittorrent.grace_hours
    ));
    out.push_str(&format!("- Media Root: {}\n", code(&config.paths.media_root)));
    if let Some(root) = &config.paths.torrent_root {
        out.push_str(&format!("- Torrent Root: {}\n", code(root)));
    }
    out.push_str(&format!(
        "- Permission Audit: {}\n",
        if config.permissions.enabled { "enabled" } else { "disabled" }
    ));

    if !config.path_mappings.is_empty() {
        out.push_str("\n### Path Mappings\n\n");
        out.push_str("| Service Path | Filesystem Path |\n");
        out.push_str("|--------------|-----------------|\n");
        for (from, to) in &config.path_mappings {
            out.push_str(&format!(
                "| `{}` | `{}` |\n",
                escape_cell(from),
                escape_cell(to)
            ));
        }
    }
    out.push('\n');
}
