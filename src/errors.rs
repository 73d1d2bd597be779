//! Typed error definitions for sync_relocate.
//! Capability failures reported by the filesystem layer, plus the failure
//! taxonomy attached to relocation outcomes.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a single filesystem capability call (move, link, resolve).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FsError {
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied on {}: {detail}", path.display())]
    PermissionDenied { path: PathBuf, detail: String },

    #[error("already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("cannot move {} across devices", path.display())]
    CrossDevice { path: PathBuf },

    #[error("filesystem at {} does not support directory links: {detail}", path.display())]
    UnsupportedFilesystem { path: PathBuf, detail: String },

    #[error("not a directory link: {}", path.display())]
    NotALink { path: PathBuf },

    #[error("link {} points at missing target {}", path.display(), target.display())]
    Dangling { path: PathBuf, target: PathBuf },

    #[error("{} was only partly removed; a full copy is at {}", path.display(), copy.display())]
    Split { path: PathBuf, copy: PathBuf },

    #[error("{detail}")]
    Io { path: PathBuf, detail: String },
}

impl FsError {
    /// Path the failed operation was acting on.
    pub fn path(&self) -> &Path {
        match self {
            FsError::NotFound { path }
            | FsError::PermissionDenied { path, .. }
            | FsError::AlreadyExists { path }
            | FsError::CrossDevice { path }
            | FsError::UnsupportedFilesystem { path, .. }
            | FsError::NotALink { path }
            | FsError::Dangling { path, .. }
            | FsError::Split { path, .. }
            | FsError::Io { path, .. } => path,
        }
    }
}

/// Returned by the inspector when a path is not a directory link.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("not a directory link: {}", path.display())]
pub struct NotAJunction {
    pub path: PathBuf,
}

/// Why a relocation (or restore) did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The engine's own precondition re-check failed; nothing was touched.
    PreconditionViolated,
    /// An entry move failed or the run was interrupted mid-move.
    MoveInterrupted,
    /// Removing the emptied directory or creating/removing the link failed.
    JunctionFailed,
    /// The link exists but does not resolve to the expected, fully populated target.
    VerificationMismatch,
    /// Undoing completed steps failed; a human has to finish the recovery.
    RollbackFailed,
}

impl FailureKind {
    /// Stable numeric code for logs and process exit status.
    pub fn code(self) -> i32 {
        match self {
            FailureKind::PreconditionViolated => 10,
            FailureKind::MoveInterrupted => 11,
            FailureKind::JunctionFailed => 12,
            FailureKind::VerificationMismatch => 13,
            FailureKind::RollbackFailed => 20,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::PreconditionViolated => "precondition_violated",
            FailureKind::MoveInterrupted => "move_interrupted",
            FailureKind::JunctionFailed => "junction_failed",
            FailureKind::VerificationMismatch => "verification_mismatch",
            FailureKind::RollbackFailed => "rollback_failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
