//! Signal combination: reconciles scanned files, manager records and torrents.
//!
//! The engine performs no I/O of its own apart from optional link-count
//! queries through an injected [`LinkCounter`], and it cannot fail. Missing
//! inputs degrade the result (more orphans) rather than aborting the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use rayon::prelude::*;

use auditarr_core::{
    AuditConfig, DEFAULT_DOWNLOAD_GRACE_HOURS, DEFAULT_MANAGER_GRACE_HOURS, LinkCounter,
    ManagedFile, ManagerKind, MediaFile, MediaOrigin, PathKey, PathMappings, PermissionRecord,
    Torrent, UnknownLinks, is_subtitle_file, is_under, normalize,
};

use crate::classify::{Verdict, classify, classify_download};
use crate::diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticSink, NullSink};
use crate::grace::within_grace;
use crate::permissions::{PermissionAuditor, PermissionPolicy};
use crate::result::{AnalysisResult, ClassifiedMedia, SuspiciousFile};
use crate::suspicious::SuspiciousDetector;

/// Immutable engine configuration.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct EngineConfig {
    /// Grace window for files claimed by the series manager.
    #[builder(default = "DEFAULT_MANAGER_GRACE_HOURS")]
    pub sonarr_grace_hours: i64,

    /// Grace window for files claimed by the movie manager.
    #[builder(default = "DEFAULT_MANAGER_GRACE_HOURS")]
    pub radarr_grace_hours: i64,

    /// Grace window for completed torrents and unclaimed downloads.
    #[builder(default = "DEFAULT_DOWNLOAD_GRACE_HOURS")]
    pub download_grace_hours: i64,

    /// Suspicious extensions. Empty selects the built-in set.
    #[builder(default)]
    pub suspicious_extensions: Vec<String>,

    /// Report archives as suspicious.
    #[builder(default)]
    pub flag_archives: bool,

    /// Ownership policy. `None` disables permission auditing.
    #[builder(default)]
    pub permissions: Option<PermissionPolicy>,

    /// Files and permission records under these prefixes are ignored.
    #[builder(default)]
    pub skip_paths: Vec<PathBuf>,

    /// Service-visible prefixes to local prefixes.
    #[builder(default)]
    pub path_mappings: PathMappings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sonarr_grace_hours: DEFAULT_MANAGER_GRACE_HOURS,
            radarr_grace_hours: DEFAULT_MANAGER_GRACE_HOURS,
            download_grace_hours: DEFAULT_DOWNLOAD_GRACE_HOURS,
            suspicious_extensions: Vec::new(),
            flag_archives: false,
            permissions: None,
            skip_paths: Vec::new(),
            path_mappings: PathMappings::new(),
        }
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Derive the engine configuration from the configuration file.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            sonarr_grace_hours: config.sonarr.grace_hours,
            radarr_grace_hours: config.radarr.grace_hours,
            download_grace_hours: config.qbittorrent.grace_hours,
            suspicious_extensions: config.suspicious.extensions.clone(),
            flag_archives: config.suspicious.flag_archives,
            permissions: PermissionPolicy::from_config(&config.permissions),
            skip_paths: config.permissions.skip_paths.clone(),
            path_mappings: config.path_mappings(),
        }
    }

    /// Same configuration with permission auditing disabled.
    pub fn without_permissions(self) -> Self {
        Self {
            permissions: None,
            ..self
        }
    }

    fn grace_for(&self, manager: ManagerKind) -> i64 {
        match manager {
            ManagerKind::Sonarr => self.sonarr_grace_hours,
            ManagerKind::Radarr => self.radarr_grace_hours,
        }
    }

    fn is_skipped(&self, path: &Path) -> bool {
        self.skip_paths.iter().any(|skip| is_under(path, skip))
    }
}

/// Everything collected for one run.
#[derive(Debug, Clone, Default)]
pub struct AuditInputs {
    /// Scanned library and download files.
    pub media: Vec<MediaFile>,
    /// Series manager records.
    pub sonarr: Vec<ManagedFile>,
    /// Movie manager records.
    pub radarr: Vec<ManagedFile>,
    /// Download client jobs.
    pub torrents: Vec<Torrent>,
    /// Ownership records.
    pub permissions: Vec<PermissionRecord>,
}

/// Per-file evaluation, produced in parallel and folded in scan order.
struct FileOutcome {
    classified: Option<ClassifiedMedia>,
    suspicious: Option<SuspiciousFile>,
}

/// Normalized path to the record that claims it.
type ManagedLookup<'a> = HashMap<PathKey, &'a ManagedFile>;

/// The reconciliation engine.
pub struct Engine {
    config: EngineConfig,
    detector: SuspiciousDetector,
    auditor: Option<PermissionAuditor>,
    links: Arc<dyn LinkCounter>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Engine {
    /// Create an engine. Link counts come only from scanned files and
    /// diagnostics are discarded until configured otherwise.
    pub fn new(config: EngineConfig) -> Self {
        let detector =
            SuspiciousDetector::new(config.suspicious_extensions.iter(), config.flag_archives);
        let auditor = config.permissions.clone().map(PermissionAuditor::new);
        Self {
            config,
            detector,
            auditor,
            links: Arc::new(UnknownLinks),
            diagnostics: Arc::new(NullSink),
        }
    }

    /// Answer link counts for torrent files that were not scanned.
    pub fn with_link_counter(mut self, links: Arc<dyn LinkCounter>) -> Self {
        self.links = links;
        self
    }

    /// Send diagnostics to `sink`.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Run one pass against the current time.
    pub fn analyze(&self, inputs: &AuditInputs) -> AnalysisResult {
        self.analyze_at(inputs, Utc::now())
    }

    /// Run one pass against a fixed reference time.
    pub fn analyze_at(&self, inputs: &AuditInputs, now: DateTime<Utc>) -> AnalysisResult {
        let mut result = AnalysisResult::default();

        let (lookup, conflicts) = self.build_lookup(&inputs.sonarr, &inputs.radarr);
        result.summary.manager_conflicts = conflicts;

        let files: Vec<&MediaFile> = inputs
            .media
            .iter()
            .filter(|file| !self.config.is_skipped(&file.path))
            .collect();
        result.summary.total_files = files.len();

        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|file| self.evaluate(file, &lookup, now))
            .collect();

        for outcome in outcomes {
            if let Some(classified) = outcome.classified {
                result.summary.record_classification(classified.classification);
                result.classified.push(classified);
            }
            if let Some(suspicious) = outcome.suspicious {
                result.summary.suspicious += 1;
                result.suspicious.push(suspicious);
            }
        }

        let scanned: HashMap<PathKey, &MediaFile> = inputs
            .media
            .iter()
            .map(|file| (normalize(&file.path), file))
            .collect();
        let (unlinked, empty) = self.unlinked_torrents(&inputs.torrents, &scanned, &lookup, now);
        result.unlinked_torrents = unlinked;
        result.summary.unlinked_torrents = result.unlinked_torrents.len();
        result.summary.empty_torrents = empty;

        if let Some(auditor) = &self.auditor {
            for record in &inputs.permissions {
                if self.config.is_skipped(&record.path) {
                    continue;
                }
                for issue in auditor.audit(record) {
                    result.summary.record_permission(issue.severity);
                    result.permission_issues.push(issue);
                }
            }
        }

        self.emit(Diagnostic::new(
            DiagnosticLevel::Info,
            format!(
                "classified {} of {} files: {} healthy, {} at risk, {} orphaned, {} orphaned downloads",
                result.classified.len(),
                result.summary.total_files,
                result.summary.healthy,
                result.summary.at_risk,
                result.summary.orphan,
                result.summary.orphaned_download
            ),
        ));

        result
    }

    /// Merge both managers' records; a later record replaces an earlier one.
    fn build_lookup<'a>(
        &self,
        sonarr: &'a [ManagedFile],
        radarr: &'a [ManagedFile],
    ) -> (ManagedLookup<'a>, usize) {
        let mut lookup = ManagedLookup::with_capacity(sonarr.len() + radarr.len());
        let mut conflicts = 0;

        for record in sonarr.iter().chain(radarr).filter(|r| r.is_known()) {
            let local = self.config.path_mappings.remap(&record.path);
            let Some(previous) = lookup.insert(normalize(&local), record) else {
                continue;
            };

            if previous.manager() != record.manager() {
                conflicts += 1;
                self.emit(
                    Diagnostic::warn(format!(
                        "path claimed by both {} and {}; using {}",
                        previous.manager(),
                        record.manager(),
                        record.manager()
                    ))
                    .at(local),
                );
            } else {
                self.emit(
                    Diagnostic::debug(format!("duplicate {} record", record.manager())).at(local),
                );
            }
        }

        (lookup, conflicts)
    }

    fn evaluate(&self, file: &MediaFile, lookup: &ManagedLookup<'_>, now: DateTime<Utc>) -> FileOutcome {
        let record = lookup.get(&normalize(&file.path)).copied();

        let verdict = match record {
            Some(record) => classify(
                file,
                Some(record),
                self.config.grace_for(record.manager()),
                now,
            ),
            None if file.origin == MediaOrigin::Download => {
                classify_download(file, self.config.download_grace_hours, now)
            }
            None => classify(file, None, 0, now),
        };

        // Subtitles are expected to exist without their own record.
        let classified = verdict
            .classification()
            .filter(|c| !(c.is_orphan() && is_subtitle_file(&file.path)))
            .map(|classification| ClassifiedMedia {
                file: file.clone(),
                classification,
                manager: record.map(ManagedFile::manager),
                known: record.is_some_and(ManagedFile::is_known),
                reason: classification.reason().to_string(),
            });

        let suspicious = self.detector.detect(&file.path).map(|reason| SuspiciousFile {
            path: file.path.clone(),
            reason,
            size: file.size,
        });

        FileOutcome {
            classified,
            suspicious,
        }
    }

    /// Completed torrents with no protected file, plus the number of
    /// completed torrents that list no files at all.
    fn unlinked_torrents(
        &self,
        torrents: &[Torrent],
        scanned: &HashMap<PathKey, &MediaFile>,
        lookup: &ManagedLookup<'_>,
        now: DateTime<Utc>,
    ) -> (Vec<Torrent>, usize) {
        let mut unlinked = Vec::new();
        let mut empty = 0;

        for torrent in torrents {
            if !torrent.is_completed()
                || within_grace(torrent.completed_on, now, self.config.download_grace_hours)
            {
                continue;
            }

            if torrent.files.is_empty() {
                self.emit(
                    Diagnostic::warn(format!("torrent {} reports no files", torrent.name))
                        .at(&torrent.save_path),
                );
                empty += 1;
                continue;
            }

            let linked = torrent
                .file_paths()
                .any(|path| self.is_protected(&path, scanned, lookup));
            if !linked {
                self.emit(
                    Diagnostic::debug(format!("torrent {} is unlinked", torrent.name))
                        .at(torrent.content_path()),
                );
                unlinked.push(torrent.clone());
            }
        }

        (unlinked, empty)
    }

    /// Whether a torrent payload file is hardlinked or imported by a manager.
    fn is_protected(
        &self,
        path: &Path,
        scanned: &HashMap<PathKey, &MediaFile>,
        lookup: &ManagedLookup<'_>,
    ) -> bool {
        let local = self.config.path_mappings.remap(path);
        let key = normalize(&local);

        let hardlinked = match scanned.get(&key) {
            Some(file) => file.is_hardlinked(),
            None => self.links.link_count(&local).is_some_and(|count| count > 1),
        };

        hardlinked || lookup.contains_key(&key)
    }

    fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.emit(diagnostic);
    }
}
