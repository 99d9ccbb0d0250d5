//! Report writer and notifier tests.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use auditarr_analyze::{AnalysisResult, Classification, ClassifiedMedia, SuspicionReason, SuspiciousFile};
use auditarr_core::{
    AuditConfig, IssueKind, ManagerKind, MediaFile, PermissionIssue, PermissionRecord, ReportFormat,
    Severity, Torrent, TorrentState,
};
use auditarr_report::{DiscordNotifier, ReportError, ReportWriter, render_markdown};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

fn sample_result() -> AnalysisResult {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let old = now - chrono::Duration::days(10);
    let media = |path: &str, classification: Classification, manager: Option<ManagerKind>| ClassifiedMedia {
        file: MediaFile::new(path, 1024 * 1024, old, 1),
        classification,
        manager,
        known: manager.is_some(),
        reason: classification.reason().to_string(),
    };

    let mut result = AnalysisResult {
        classified: vec![
            media("/media/tv/b|pipe.mkv", Classification::Orphan, None),
            media("/media/tv/a.mkv", Classification::Orphan, None),
            media("/media/movies/m.mkv", Classification::AtRisk, Some(ManagerKind::Radarr)),
            media("/media/tv/ok.mkv", Classification::Healthy, Some(ManagerKind::Sonarr)),
        ],
        suspicious: vec![SuspiciousFile {
            path: PathBuf::from("/media/tv/show.mkv.exe"),
            reason: SuspicionReason::DoubleExtension,
            size: 10,
        }],
        unlinked_torrents: vec![Torrent {
            hash: "abc".into(),
            name: "Old.Release".into(),
            save_path: PathBuf::from("/torrents"),
            state: TorrentState::Completed,
            completed_on: Some(now - chrono::Duration::days(2)),
            size: 2048,
            files: vec![PathBuf::from("Old.Release/a.mkv")],
        }],
        permission_issues: vec![PermissionIssue::new(
            &PermissionRecord::file("/media/tv/a.mkv", 0o644, 1000, 100),
            IssueKind::NotGroupWritable,
            Severity::Warning,
            "chmod g+w '/media/tv/a.mkv'",
        )],
        ..Default::default()
    };
    result.summary.orphan = 2;
    result.summary.at_risk = 1;
    result.summary.healthy = 1;
    result.summary.suspicious = 1;
    result.summary.unlinked_torrents = 1;
    result.summary.permission_warnings = 1;
    result.summary.duration = Duration::from_secs(3);
    result
}

#[test]
fn test_markdown_sections() {
    let generated_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let report = render_markdown(&sample_result(), &AuditConfig::default(), generated_at);

    for heading in [
        "## Summary",
        "## At Risk Media",
        "## Orphaned Media",
        "## Suspicious Files",
        "## Unlinked Torrents",
        "## Permission Issues",
        "## Configuration",
    ] {
        assert!(report.contains(heading), "missing {heading}");
    }
    assert!(!report.contains("## Orphaned Downloads"));

    // Sorted by path, pipes escaped.
    let a = report.find("`/media/tv/a.mkv`").unwrap();
    let b = report.find("`/media/tv/b\\|pipe.mkv`").unwrap();
    assert!(a < b);

    assert!(report.contains("| radarr | 10 days |"));
    assert!(report.contains("`/torrents/Old.Release`"));
    assert!(report.contains("2 days ago"));
    assert!(report.contains("| 0644 | 1000:100 |"));
    assert!(report.contains("**Duration**: 3.0 seconds"));
}

#[test]
fn test_writer_writes_configured_formats() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("nested").join("reports");
    let generated_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let writer = ReportWriter::new(&dir, vec![ReportFormat::Markdown, ReportFormat::Json]);
    let written = writer
        .write(&sample_result(), &AuditConfig::default(), generated_at)
        .unwrap();

    assert_eq!(
        written,
        vec![
            dir.join("audit-report-2024-06-01-12-00-00.md"),
            dir.join("audit-report-2024-06-01-12-00-00.json"),
        ]
    );

    let json = std::fs::read_to_string(&written[1]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"]["orphan_count"], 2);
    assert_eq!(value["orphaned_media"][0]["path"], "/media/tv/a.mkv");
    assert_eq!(value["at_risk"][0]["manager"], "radarr");
    assert_eq!(value["permission_issues"][0]["issue"], "not_group_writable");
    assert_eq!(value["permission_issues"][0]["mode"], "0644");
    assert_eq!(value["unlinked_torrents"][0]["completed"], "2 days ago");
}

#[test]
fn test_writer_reports_unwritable_directory() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();

    let writer = ReportWriter::new(blocker.join("reports"), vec![ReportFormat::Markdown]);
    let err = writer
        .write(&AnalysisResult::default(), &AuditConfig::default(), Utc::now())
        .unwrap_err();
    assert!(matches!(err, ReportError::Io { .. }));
}

/// Answer a single request with `status`, handing back the request body.
fn one_shot(status: u16) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/webhook", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                length = value.trim().parse().unwrap();
            }
        }
        let mut body = vec![0; length];
        reader.read_exact(&mut body).unwrap();
        tx.send(String::from_utf8(body).unwrap()).unwrap();

        let reply = format!("HTTP/1.1 {status} X\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        stream.write_all(reply.as_bytes()).unwrap();
    });

    (url, rx)
}

#[tokio::test]
async fn test_webhook_delivery() {
    let (url, body) = one_shot(204);
    let notifier = DiscordNotifier::new(url).unwrap();
    notifier
        .send(&sample_result(), "/reports/audit-report.md")
        .await
        .unwrap();

    let payload: serde_json::Value = serde_json::from_str(&body.recv().unwrap()).unwrap();
    assert_eq!(payload["embeds"][0]["color"], 15158332);
    assert_eq!(
        payload["embeds"][0]["fields"][1]["value"],
        "/reports/audit-report.md"
    );
}

#[tokio::test]
async fn test_webhook_error_status() {
    let (url, _body) = one_shot(500);
    let notifier = DiscordNotifier::new(url).unwrap();
    let err = notifier
        .send(&AnalysisResult::default(), "/reports/x.md")
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::WebhookStatus(500)));
}
