//! Discord-style webhook notifications.

use std::time::Duration;

use serde_json::{Value, json};

use auditarr_analyze::{AnalysisResult, SummaryStats};

use crate::error::ReportError;
use crate::format::format_seconds;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Embed colour for orphans or permission errors.
pub const COLOR_RED: u32 = 15158332;
/// Embed colour for at-risk files or permission warnings.
pub const COLOR_YELLOW: u32 = 16776960;
/// Embed colour for a clean run.
pub const COLOR_BLUE: u32 = 3447003;

/// Embed colour for a summary.
pub fn embed_color(summary: &SummaryStats) -> u32 {
    if summary.orphan > 0 || summary.permission_errors > 0 {
        COLOR_RED
    } else if summary.at_risk > 0 || summary.permission_warnings > 0 {
        COLOR_YELLOW
    } else {
        COLOR_BLUE
    }
}

/// Build the webhook payload for a finished run.
pub fn build_payload(result: &AnalysisResult, report_location: &str) -> Value {
    let s = &result.summary;

    let mut lines = vec![
        format!("{} healthy (tracked + hardlinked)", s.healthy),
        format!("{} at risk (tracked, not hardlinked)", s.at_risk),
        format!("{} orphaned (not tracked)", s.orphan),
    ];
    if s.orphaned_download > 0 {
        lines.push(format!("{} orphaned download(s)", s.orphaned_download));
    }
    lines.push(format!("{} suspicious file(s)", s.suspicious));
    if s.unlinked_torrents > 0 {
        lines.push(format!("{} unlinked torrent(s)", s.unlinked_torrents));
    }
    let permission_issues = s.permission_errors + s.permission_warnings;
    if permission_issues > 0 {
        lines.push(format!("{permission_issues} permission issue(s)"));
    }

    json!({
        "content": null,
        "embeds": [{
            "title": "Media Audit Complete",
            "color": embed_color(s),
            "fields": [
                { "name": "Summary", "value": lines.join("\n"), "inline": false },
                { "name": "Report Location", "value": report_location, "inline": false },
            ],
            "footer": { "text": format!("Duration: {}s", format_seconds(s.duration)) },
        }],
    })
}

/// Posts run summaries to a webhook. An empty URL disables delivery.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(ReportError::Webhook)?;
        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }

    /// Send a summary of `result`. No-op when disabled.
    pub async fn send(
        &self,
        result: &AnalysisResult,
        report_location: &str,
    ) -> Result<(), ReportError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.webhook_url.trim())
            .json(&build_payload(result, report_location))
            .send()
            .await
            .map_err(ReportError::Webhook)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::WebhookStatus(status.as_u16()));
        }
        tracing::debug!("webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_color() {
        let mut summary = SummaryStats::default();
        assert_eq!(embed_color(&summary), COLOR_BLUE);

        summary.permission_warnings = 1;
        assert_eq!(embed_color(&summary), COLOR_YELLOW);

        summary.permission_warnings = 0;
        summary.at_risk = 2;
        assert_eq!(embed_color(&summary), COLOR_YELLOW);

        summary.orphan = 1;
        assert_eq!(embed_color(&summary), COLOR_RED);

        summary.orphan = 0;
        summary.at_risk = 0;
        summary.permission_errors = 1;
        assert_eq!(embed_color(&summary), COLOR_RED);
    }

    #[test]
    fn test_payload_fields() {
        let mut result = AnalysisResult::default();
        result.summary.healthy = 4;
        result.summary.permission_errors = 1;
        result.summary.permission_warnings = 2;
        result.summary.duration = Duration::from_millis(12_340);

        let payload = build_payload(&result, "/reports/audit.md");
        let embed = &payload["embeds"][0];
        let summary = embed["fields"][0]["value"].as_str().unwrap();

        assert!(payload["content"].is_null());
        assert_eq!(embed["color"], COLOR_RED);
        assert!(summary.starts_with("4 healthy"));
        assert!(summary.contains("3 permission issue(s)"));
        assert!(!summary.contains("unlinked"));
        assert_eq!(embed["fields"][1]["value"], "/reports/audit.md");
        assert_eq!(embed["footer"]["text"], "Duration: 12.3s");
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_noop() {
        let notifier = DiscordNotifier::new("  ").unwrap();
        assert!(!notifier.is_enabled());
        notifier
            .send(&AnalysisResult::default(), "/reports/x.md")
            .await
            .unwrap();
    }
}
