//! Data model shared by the validator, engine, inspector and orchestrator.
//!
//! Everything here is plain data: created per request, handed back to the
//! presentation layer, never cached between calls.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::errors::{FailureKind, FsError};
use crate::utils::normalize_path;

/// Knobs passed along with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelocationOptions {
    /// Run the validator only; never touch the filesystem.
    pub validate_only: bool,
    /// Report every operation step, not just the outcome.
    pub verbose: bool,
    /// Minimum free bytes required at the target volume (0 disables the check).
    pub min_free_space: u64,
    /// Extra directories (and everything below them) that must never be relocated.
    pub protected_paths: Vec<PathBuf>,
    /// Cloud sync folder; a target outside it draws a warning.
    pub sync_root: Option<PathBuf>,
}

/// One (source, target) relocation, with both paths absolute and normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    pub options: RelocationOptions,
}

impl RelocationRequest {
    /// Build a request, making both paths absolute and lexically clean.
    /// Links are not resolved: the source may itself be a link.
    pub fn new(
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
        options: RelocationOptions,
    ) -> Result<Self> {
        let source = source.as_ref();
        let target = target.as_ref();
        Ok(Self {
            source: normalize_path(source)
                .with_context(|| format!("invalid source path '{}'", source.display()))?,
            target: normalize_path(target)
                .with_context(|| format!("invalid target path '{}'", target.display()))?,
            options,
        })
    }
}

/// A single reason the validator refuses a request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("{} is not a usable directory: {reason}", path.display())]
    NotADirectory { path: PathBuf, reason: String },

    #[error("{} is already a directory link{}", path.display(), link_suffix(target.as_deref()))]
    AlreadyLinked {
        path: PathBuf,
        target: Option<PathBuf>,
    },

    #[error("target {} is not empty ({entries} entries); refusing to merge", path.display())]
    TargetNotEmpty { path: PathBuf, entries: usize },

    #[error("{} is protected: {reason}", path.display())]
    ProtectedPath { path: PathBuf, reason: String },

    #[error("missing {needed} permission on {}", path.display())]
    PermissionDenied { path: PathBuf, needed: String },

    #[error("source {} and target {} overlap", source_path.display(), target_path.display())]
    OverlappingPaths {
        source_path: PathBuf,
        target_path: PathBuf,
    },

    #[error("only {available} bytes free at {}, {required} required", path.display())]
    InsufficientSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    #[error("{} is {length} characters long; the limit is {limit}", path.display())]
    PathTooLong {
        path: PathBuf,
        length: usize,
        limit: usize,
    },
}

/// Something worth telling the user that does not block the request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    #[error("target {} is outside the sync folder {}; its contents will not be synced", target.display(), sync_root.display())]
    OutsideSyncRoot { target: PathBuf, sync_root: PathBuf },
}

fn link_suffix(target: Option<&Path>) -> String {
    target
        .map(|t| format!(" to {}", t.display()))
        .unwrap_or_default()
}

impl ValidationFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationFailure::NotADirectory { .. } => "not_a_directory",
            ValidationFailure::AlreadyLinked { .. } => "already_linked",
            ValidationFailure::TargetNotEmpty { .. } => "target_not_empty",
            ValidationFailure::ProtectedPath { .. } => "protected_path",
            ValidationFailure::PermissionDenied { .. } => "permission_denied",
            ValidationFailure::OverlappingPaths { .. } => "overlapping_paths",
            ValidationFailure::InsufficientSpace { .. } => "insufficient_space",
            ValidationFailure::PathTooLong { .. } => "path_too_long",
        }
    }
}

/// Every problem found with a request. `ok` holds iff `failures` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    ok: bool,
    failures: Vec<ValidationFailure>,
    warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        Self {
            ok: failures.is_empty(),
            failures,
            warnings: Vec::new(),
        }
    }

    /// Attach non-blocking findings; `ok` is unaffected.
    pub fn with_warnings(mut self, warnings: Vec<ValidationWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Failures in check order.
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }
}

/// A completed (or, for link changes, about-to-be-attempted) filesystem step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum OperationStep {
    /// A directory that did not exist before was created.
    CreatedDirectory { path: PathBuf },
    /// A top-level entry now lives at `target` instead of `source`.
    MovedContents { source: PathBuf, target: PathBuf },
    /// An emptied directory was removed.
    DeletedOriginal { path: PathBuf },
    /// A directory link was placed at `path` pointing to `target`.
    CreatedJunction { path: PathBuf, target: PathBuf },
    /// The directory link at `path` (pointing to `target`) was removed.
    RemovedJunction { path: PathBuf, target: PathBuf },
}

impl fmt::Display for OperationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStep::CreatedDirectory { path } => {
                write!(f, "created directory {}", path.display())
            }
            OperationStep::MovedContents { source, target } => {
                write!(f, "moved {} -> {}", source.display(), target.display())
            }
            OperationStep::DeletedOriginal { path } => {
                write!(f, "deleted emptied directory {}", path.display())
            }
            OperationStep::CreatedJunction { path, target } => {
                write!(f, "linked {} -> {}", path.display(), target.display())
            }
            OperationStep::RemovedJunction { path, target } => {
                write!(f, "unlinked {} (was -> {})", path.display(), target.display())
            }
        }
    }
}

/// How a directory link resolved at inspection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Target exists, is a directory and can be listed.
    Valid,
    /// Target does not exist.
    Dangling,
    /// Target exists but is not a directory.
    Misdirected,
    /// Target (or the link itself) cannot be read.
    Unreadable,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkStatus::Valid => "valid",
            LinkStatus::Dangling => "dangling",
            LinkStatus::Misdirected => "misdirected",
            LinkStatus::Unreadable => "unreadable",
        })
    }
}

/// A directory link as observed by one inspection call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JunctionRecord {
    pub link_path: PathBuf,
    pub real_target: PathBuf,
    pub is_valid: bool,
    pub status: LinkStatus,
    /// When the link itself was created, where the filesystem records it.
    pub created: Option<DateTime<Local>>,
}

impl JunctionRecord {
    pub fn new(link_path: PathBuf, real_target: PathBuf, status: LinkStatus) -> Self {
        Self {
            link_path,
            real_target,
            is_valid: status == LinkStatus::Valid,
            status,
            created: None,
        }
    }

    pub fn with_created(mut self, created: Option<DateTime<Local>>) -> Self {
        self.created = created;
        self
    }
}

/// Failure kind plus a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// A step the rollback could not undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackFailure {
    pub step: OperationStep,
    pub error: FsError,
}

/// What is left on disk after a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResidualState {
    /// Steps recorded before the failure, in execution order.
    pub completed: Vec<OperationStep>,
    /// Steps whose undo failed during rollback.
    pub rollback_failures: Vec<RollbackFailure>,
    /// Set only when software recovery is exhausted.
    pub manual_recovery_required: bool,
    /// The failure that triggered the rollback, when the rollback itself failed.
    pub cause: Option<Failure>,
    pub description: String,
}

impl ResidualState {
    /// Nothing was changed on disk.
    pub fn untouched() -> Self {
        Self {
            completed: Vec::new(),
            rollback_failures: Vec::new(),
            manual_recovery_required: false,
            cause: None,
            description: "no filesystem changes were made".into(),
        }
    }
}

/// Final result of one relocation or restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum RelocationOutcome {
    /// The directory link at this path is in place and verified.
    Success(PathBuf),
    /// A step failed and every completed step was undone.
    RolledBack {
        reason: Failure,
        steps: Vec<OperationStep>,
    },
    /// The run stopped with changes on disk; `residual` says what they are.
    Failed {
        reason: Failure,
        residual: ResidualState,
    },
}

impl RelocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RelocationOutcome::Success(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            RelocationOutcome::Success(_) => None,
            RelocationOutcome::RolledBack { reason, .. }
            | RelocationOutcome::Failed { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_ok_iff_no_failures() {
        assert!(ValidationResult::from_failures(Vec::new()).is_ok());
        let r = ValidationResult::from_failures(vec![ValidationFailure::TargetNotEmpty {
            path: PathBuf::from("/t"),
            entries: 1,
        }]);
        assert!(!r.is_ok());
        assert_eq!(r.failures().len(), 1);
    }

    #[test]
    fn record_validity_follows_status() {
        let r = JunctionRecord::new("/l".into(), "/t".into(), LinkStatus::Dangling);
        assert!(!r.is_valid);
        let r = JunctionRecord::new("/l".into(), "/t".into(), LinkStatus::Valid);
        assert!(r.is_valid);
    }

    #[test]
    fn request_paths_are_absolute_and_clean() {
        let req = RelocationRequest::new("a/./b/../c", "t", RelocationOptions::default()).unwrap();
        assert!(req.source.is_absolute());
        assert!(req.source.ends_with("a/c"));
        assert!(req.target.ends_with("t"));
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = RelocationRequest::new("", "t", RelocationOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid source path"));
    }

    #[test]
    fn already_linked_message_names_target() {
        let f = ValidationFailure::AlreadyLinked {
            path: PathBuf::from("/src"),
            target: Some(PathBuf::from("/cloud/src")),
        };
        assert!(f.to_string().contains("/cloud/src"));
        assert_eq!(f.kind(), "already_linked");
    }
}
