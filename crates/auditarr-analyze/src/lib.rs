//! Analysis for auditarr.
//!
//! This crate turns collected observations into verdicts:
//!
//! - **Classification** - every scanned file becomes `healthy`, `at_risk`,
//!   `orphan` or `orphaned_download`, unless it is still within its grace window
//! - **Suspicious files** - executables and disguised payloads by name
//! - **Unlinked torrents** - completed downloads with no hardlinked or managed copy
//! - **Permissions** - ownership, group, mode and setgid policy checks
//!
//! ```rust,ignore
//! use auditarr_analyze::{AuditInputs, Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default());
//! let result = engine.analyze(&AuditInputs {
//!     media: scan.files,
//!     sonarr,
//!     radarr,
//!     ..Default::default()
//! });
//!
//! println!("{} orphaned, {} at risk", result.summary.orphan, result.summary.at_risk);
//! ```

mod classify;
mod diagnostics;
mod engine;
pub mod grace;
mod permissions;
mod result;
mod suspicious;

pub use classify::{Classification, Verdict, classify, classify_download};
pub use diagnostics::{
    Diagnostic, DiagnosticLevel, DiagnosticSink, MemorySink, NullSink, TracingSink,
};
pub use engine::{AuditInputs, Engine, EngineConfig, EngineConfigBuilder};
pub use grace::within_grace;
pub use permissions::{PermissionAuditor, PermissionPolicy};
pub use result::{AnalysisResult, ClassifiedMedia, ServiceStatus, SummaryStats, SuspiciousFile};
pub use suspicious::{
    ARCHIVE_EXTENSIONS, DEFAULT_SUSPICIOUS_EXTENSIONS, SuspicionReason, SuspiciousDetector,
};

// Re-export core types
pub use auditarr_core::{ManagedFile, MediaFile, PermissionIssue, PermissionRecord, Torrent};
