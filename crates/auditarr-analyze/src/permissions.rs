//! Ownership policy checks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use auditarr_core::{
    IssueKind, MetadataFilter, PermissionIssue, PermissionRecord, PermissionsConfig, Severity,
    is_under,
};

const ROOT_UID: u32 = 0;

/// Expected ownership of the library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPolicy {
    /// The shared media group.
    pub group_gid: u32,
    /// Users allowed to own entries.
    pub allowed_uids: Vec<u32>,
    /// Directories under these prefixes must carry the setgid bit.
    pub sgid_paths: Vec<PathBuf>,
    /// Severity of world-writable entries and executable regular files.
    pub nonstandard_severity: Severity,
}

impl PermissionPolicy {
    /// Policy from the file configuration, or `None` when auditing is off.
    pub fn from_config(config: &PermissionsConfig) -> Option<Self> {
        config.enabled.then(|| Self {
            group_gid: config.group_gid,
            allowed_uids: config.allowed_uids.clone(),
            sgid_paths: config.sgid_paths.clone(),
            nonstandard_severity: config.nonstandard_severity,
        })
    }

    fn requires_sgid(&self, path: &Path) -> bool {
        self.sgid_paths.iter().any(|prefix| is_under(path, prefix))
    }

    fn allowed_owners(&self) -> String {
        self.allowed_uids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Evaluates permission records against a [`PermissionPolicy`].
#[derive(Debug, Clone)]
pub struct PermissionAuditor {
    policy: PermissionPolicy,
    metadata: MetadataFilter,
}

impl PermissionAuditor {
    /// Create an auditor for a policy.
    pub fn new(policy: PermissionPolicy) -> Self {
        Self {
            policy,
            metadata: MetadataFilter::new(),
        }
    }

    /// All deviations of one entry. Metadata sidecars are never audited.
    pub fn audit(&self, record: &PermissionRecord) -> Vec<PermissionIssue> {
        if self.metadata.matches(&record.path) {
            return Vec::new();
        }

        let policy = &self.policy;
        let path = record.path.display();
        let mut issues = Vec::new();

        if !policy.allowed_uids.contains(&record.uid) {
            // No chown suggestion without an allowed owner to hand the entry to.
            let fix = match policy.allowed_uids.first() {
                Some(expected) => format!(": chown {expected} '{path}'"),
                None => String::new(),
            };
            let (severity, hint) = if record.is_dir && record.uid == ROOT_UID {
                (
                    Severity::Warning,
                    format!(
                        "Directory owned by root (uid 0), expected one of [{}]{fix}",
                        policy.allowed_owners()
                    ),
                )
            } else {
                (
                    Severity::Error,
                    format!(
                        "Owned by uid {}, expected one of [{}]{fix}",
                        record.uid,
                        policy.allowed_owners()
                    ),
                )
            };
            issues.push(PermissionIssue::new(
                record,
                IssueKind::WrongOwner,
                severity,
                hint,
            ));
        }

        if record.gid != policy.group_gid {
            issues.push(PermissionIssue::new(
                record,
                IssueKind::WrongGroup,
                Severity::Error,
                format!(
                    "Group is gid {}, expected {}: chgrp {} '{path}'",
                    record.gid, policy.group_gid, policy.group_gid
                ),
            ));
        }

        if !record.group_writable() {
            issues.push(PermissionIssue::new(
                record,
                IssueKind::NotGroupWritable,
                Severity::Warning,
                format!("Group cannot write, which breaks hardlinking: chmod g+w '{path}'"),
            ));
        }

        if record.is_dir && !record.has_sgid() && policy.requires_sgid(&record.path) {
            issues.push(PermissionIssue::new(
                record,
                IssueKind::MissingSgid,
                Severity::Warning,
                format!("New entries will not inherit the group: chmod g+s '{path}'"),
            ));
        }

        let stray_exec = !record.is_dir && record.executable();
        if record.world_writable() || stray_exec {
            let change = match (record.world_writable(), stray_exec) {
                (true, true) => "o-w,a-x",
                (true, false) => "o-w",
                _ => "a-x",
            };
            issues.push(PermissionIssue::new(
                record,
                IssueKind::NonstandardPermissions,
                policy.nonstandard_severity,
                format!(
                    "Unexpected mode {}: chmod {change} '{path}'",
                    record.mode_string()
                ),
            ));
        }

        issues
    }
}
