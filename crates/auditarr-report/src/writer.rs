//! Writes rendered reports into the report directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use auditarr_analyze::AnalysisResult;
use auditarr_core::{AuditConfig, ReportFormat};

use crate::error::ReportError;
use crate::json::render_json;
use crate::markdown::render_markdown;

/// File name for a report generated at `generated_at`.
pub fn report_file_name(generated_at: DateTime<Utc>, format: ReportFormat) -> String {
    format!(
        "audit-report-{}.{}",
        generated_at.format("%Y-%m-%d-%H-%M-%S"),
        format.extension()
    )
}

/// Writes one file per configured format.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    formats: Vec<ReportFormat>,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>, formats: Vec<ReportFormat>) -> Self {
        Self {
            dir: dir.into(),
            formats,
        }
    }

    /// Writer for the configured directory and formats.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.report_dir(), config.outputs.formats.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render and write every format. Returns the written paths in format order.
    pub fn write(
        &self,
        result: &AnalysisResult,
        config: &AuditConfig,
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(&self.dir).map_err(|e| ReportError::io(&self.dir, e))?;

        let mut written = Vec::with_capacity(self.formats.len());
        for &format in &self.formats {
            let content = match format {
                ReportFormat::Markdown => render_markdown(result, config, generated_at),
                ReportFormat::Json => render_json(result, generated_at)?,
            };
            let path = self.dir.join(report_file_name(generated_at, format));
            fs::write(&path, content).map_err(|e| ReportError::io(&path, e))?;
            tracing::info!(path = %path.display(), format = format.extension(), "wrote report");
            written.push(path);
        }
        Ok(written)
    }
}
