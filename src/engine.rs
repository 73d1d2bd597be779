//! Relocation engine: move-then-link with rollback.
//!
//! States run strictly forward:
//! Idle -> MovingContents -> ContentsMoved -> CreatingJunction -> JunctionCreated
//! -> Verifying -> Done. Any failure before Verifying switches to RollingBack,
//! which undoes the recorded steps in reverse order.
//!
//! Each step is recorded in the `OperationLog`. Entry moves and directory
//! creations are recorded once they succeed; link changes and directory
//! removals are recorded before they are attempted. Every undo is idempotent,
//! so undoing a step that never took effect is harmless.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::errors::{FailureKind, FsError};
use crate::fs_ops::Filesystem;
use crate::inspector::classify_target;
use crate::model::{
    Failure, LinkStatus, OperationStep, RelocationOutcome, RelocationRequest, ResidualState,
    RollbackFailure,
};
use crate::oplog::OperationLog;
use crate::shutdown;
use crate::utils::{path_exists, same_location};
use crate::validator::paths_overlap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    MovingContents,
    ContentsMoved,
    CreatingJunction,
    JunctionCreated,
    Verifying,
    Done,
    RollingBack,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Idle => "idle",
            EngineState::MovingContents => "moving contents",
            EngineState::ContentsMoved => "contents moved",
            EngineState::CreatingJunction => "creating junction",
            EngineState::JunctionCreated => "junction created",
            EngineState::Verifying => "verifying",
            EngineState::Done => "done",
            EngineState::RollingBack => "rolling back",
        };
        f.write_str(s)
    }
}

/// One engine invocation: the capability, the step log and the current state.
struct Run<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
    log: &'a mut OperationLog,
    state: EngineState,
    /// Entries left on both sides by a failed move; rollback cannot fix these.
    split: Vec<RollbackFailure>,
}

impl<'a, F: Filesystem + ?Sized> Run<'a, F> {
    fn new(fs: &'a F, log: &'a mut OperationLog) -> Self {
        Self {
            fs,
            log,
            state: EngineState::Idle,
            split: Vec::new(),
        }
    }

    fn enter(&mut self, next: EngineState) {
        debug!(from = %self.state, to = %next, "engine state");
        self.state = next;
    }

    fn record(&mut self, step: OperationStep) {
        self.log.append(step);
    }

    /// Undo every recorded step, newest first. Keeps going past failures.
    /// Split entries are reported first, untouched.
    fn roll_back(&mut self) -> Vec<RollbackFailure> {
        self.enter(EngineState::RollingBack);
        let mut failures = std::mem::take(&mut self.split);
        for step in self.log.snapshot().into_iter().rev() {
            match undo(self.fs, &step) {
                Ok(()) => debug!(step = %step, "undone"),
                Err(error) => {
                    error!(step = %step, error = %error, "undo failed");
                    failures.push(RollbackFailure { step, error });
                }
            }
        }
        failures
    }

    /// Roll back after `cause`. A clean rollback yields `RolledBack`; a
    /// rollback that could not finish yields `Failed(RollbackFailed)`.
    fn fail_with_rollback(&mut self, cause: Failure) -> RelocationOutcome {
        warn!(kind = %cause.kind, detail = %cause.detail, steps = self.log.len(), "step failed; rolling back");
        let completed = self.log.snapshot();
        let rollback_failures = self.roll_back();

        if rollback_failures.is_empty() {
            info!(kind = %cause.kind, "rollback complete; filesystem restored");
            return RelocationOutcome::RolledBack {
                reason: cause,
                steps: completed,
            };
        }

        let mut description = format!(
            "MANUAL RECOVERY REQUIRED: rollback after '{}' left {} step(s) not undone ({} completed before the failure).",
            cause,
            rollback_failures.len(),
            completed.len()
        );
        for f in &rollback_failures {
            description.push_str(&format!("\n  not undone: {} ({})", f.step, f.error));
        }
        error!(
            cause = %cause,
            completed = ?completed,
            failed = ?rollback_failures,
            "rollback failed; manual recovery required"
        );
        RelocationOutcome::Failed {
            reason: Failure::new(
                FailureKind::RollbackFailed,
                format!("{} step(s) could not be undone", rollback_failures.len()),
            ),
            residual: ResidualState {
                completed,
                rollback_failures,
                manual_recovery_required: true,
                cause: Some(cause),
                description,
            },
        }
    }

    fn verification_failed(&self, detail: String, description: String) -> RelocationOutcome {
        error!(detail = %detail, "verification mismatch");
        RelocationOutcome::Failed {
            reason: Failure::new(FailureKind::VerificationMismatch, detail),
            residual: ResidualState {
                completed: self.log.snapshot(),
                rollback_failures: Vec::new(),
                manual_recovery_required: false,
                cause: None,
                description,
            },
        }
    }

    /// Create `dir` and any missing parents, recording each one created.
    fn create_missing_dirs(&mut self, dir: &Path) -> Result<(), FsError> {
        let mut missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !path_exists(p))
            .map(Path::to_path_buf)
            .collect();
        missing.reverse();
        for path in missing {
            self.fs.create_dir(&path)?;
            self.record(OperationStep::CreatedDirectory { path });
        }
        Ok(())
    }

    /// Move every top-level entry of `from` into `to`, recording each move.
    /// Returns how many entries moved.
    fn move_all(&mut self, from: &Path, to: &Path) -> Result<usize, Failure> {
        let entries = self.fs.list_entries(from).map_err(|e| {
            Failure::new(FailureKind::MoveInterrupted, format!("cannot list {}: {e}", from.display()))
        })?;
        let mut moved = 0usize;
        for entry in entries {
            if shutdown::is_requested() {
                return Err(Failure::new(
                    FailureKind::MoveInterrupted,
                    format!("interrupted after moving {moved} entries"),
                ));
            }
            let Some(name) = entry.file_name() else {
                continue;
            };
            let dest = to.join(name);
            match self.fs.move_entry(&entry, &dest) {
                Ok(()) => {
                    self.record(OperationStep::MovedContents {
                        source: entry,
                        target: dest,
                    });
                    moved += 1;
                }
                Err(e) => {
                    // A move can fail after the data arrived (e.g. a removal error).
                    match (path_exists(&entry), path_exists(&dest)) {
                        (false, true) => self.record(OperationStep::MovedContents {
                            source: entry.clone(),
                            target: dest,
                        }),
                        (true, true) => {
                            error!(source = %entry.display(), copy = %dest.display(), "entry left on both sides");
                            self.split.push(RollbackFailure {
                                error: FsError::Split {
                                    path: entry.clone(),
                                    copy: dest.clone(),
                                },
                                step: OperationStep::MovedContents {
                                    source: entry.clone(),
                                    target: dest,
                                },
                            });
                        }
                        _ => {}
                    }
                    return Err(Failure::new(
                        FailureKind::MoveInterrupted,
                        format!("moving {} failed: {e}", entry.display()),
                    ));
                }
            }
        }

        let left = self
            .fs
            .list_entries(from)
            .map_err(|e| {
                Failure::new(
                    FailureKind::MoveInterrupted,
                    format!("cannot re-list {} after the move: {e}", from.display()),
                )
            })?
            .len();
        if left > 0 {
            return Err(Failure::new(
                FailureKind::MoveInterrupted,
                format!("{} gained {left} new entries during the move", from.display()),
            ));
        }
        Ok(moved)
    }
}

/// Reverse one step. Safe to call on a step that only partly took effect.
fn undo<F: Filesystem + ?Sized>(fs: &F, step: &OperationStep) -> Result<(), FsError> {
    match step {
        OperationStep::CreatedDirectory { path } => {
            if path_exists(path) {
                fs.remove_empty_dir(path)?;
            }
            Ok(())
        }
        OperationStep::MovedContents { source, target } => {
            match (path_exists(source), path_exists(target)) {
                (false, true) => fs.move_entry(target, source),
                (true, false) => Ok(()),
                (true, true) => Err(FsError::AlreadyExists {
                    path: source.clone(),
                }),
                (false, false) => Err(FsError::NotFound {
                    path: target.clone(),
                }),
            }
        }
        OperationStep::DeletedOriginal { path } => {
            if path_exists(path) {
                Ok(())
            } else {
                fs.create_dir(path)
            }
        }
        OperationStep::CreatedJunction { path, .. } => {
            if fs.is_dir_link(path) {
                fs.remove_dir_link(path)
            } else {
                Ok(())
            }
        }
        OperationStep::RemovedJunction { path, target } => {
            if path_exists(path) {
                Ok(())
            } else {
                fs.create_dir_link(path, target)
            }
        }
    }
}

fn precondition_failed(detail: String) -> RelocationOutcome {
    warn!(detail = %detail, "precondition violated; nothing changed");
    RelocationOutcome::Failed {
        reason: Failure::new(FailureKind::PreconditionViolated, detail),
        residual: ResidualState::untouched(),
    }
}

/// Re-check what must hold before anything is touched.
fn check_preconditions<F: Filesystem + ?Sized>(
    fs: &F,
    source: &Path,
    target: &Path,
) -> Result<(), String> {
    if fs.is_dir_link(source) {
        return Err(format!("{} is already a directory link", source.display()));
    }
    if !source.is_dir() {
        return Err(format!("{} is not an existing directory", source.display()));
    }
    if paths_overlap(source, target) {
        return Err(format!(
            "{} and {} overlap",
            source.display(),
            target.display()
        ));
    }
    if path_exists(target) {
        if fs.is_dir_link(target) || !target.is_dir() {
            return Err(format!("{} exists and is not a directory", target.display()));
        }
        let entries = fs
            .list_entries(target)
            .map_err(|e| format!("cannot list {}: {e}", target.display()))?;
        if !entries.is_empty() {
            return Err(format!(
                "{} is not empty ({} entries)",
                target.display(),
                entries.len()
            ));
        }
    }
    Ok(())
}

/// Move `request.source`'s contents into `request.target` and leave a
/// directory link at `request.source`.
///
/// A source that is already a valid link to the target counts as done:
/// `Success` is returned without touching the filesystem. A broken link to
/// the target fails the precondition check instead.
pub fn relocate<F: Filesystem + ?Sized>(
    fs: &F,
    request: &RelocationRequest,
    log: &mut OperationLog,
) -> RelocationOutcome {
    let source = request.source.as_path();
    let target = request.target.as_path();
    let mut run = Run::new(fs, log);
    info!(source = %source.display(), target = %target.display(), "relocation started");

    if let Ok(current) = fs.resolve_link(source) {
        if same_location(&current, target) && classify_target(&current) == LinkStatus::Valid {
            info!(source = %source.display(), "already relocated; nothing to do");
            run.enter(EngineState::Done);
            return RelocationOutcome::Success(source.to_path_buf());
        }
    }
    if let Err(detail) = check_preconditions(fs, source, target) {
        return precondition_failed(detail);
    }

    run.enter(EngineState::MovingContents);
    if let Err(e) = run.create_missing_dirs(target) {
        return run.fail_with_rollback(Failure::new(
            FailureKind::MoveInterrupted,
            format!("cannot create target directory: {e}"),
        ));
    }
    let moved = match run.move_all(source, target) {
        Ok(n) => n,
        Err(cause) => return run.fail_with_rollback(cause),
    };
    run.enter(EngineState::ContentsMoved);

    run.enter(EngineState::CreatingJunction);
    run.record(OperationStep::DeletedOriginal {
        path: source.to_path_buf(),
    });
    if let Err(e) = fs.remove_empty_dir(source) {
        return run.fail_with_rollback(Failure::new(
            FailureKind::JunctionFailed,
            format!("cannot remove emptied source: {e}"),
        ));
    }
    run.record(OperationStep::CreatedJunction {
        path: source.to_path_buf(),
        target: target.to_path_buf(),
    });
    if let Err(e) = fs.create_dir_link(source, target) {
        return run.fail_with_rollback(Failure::new(
            FailureKind::JunctionFailed,
            format!("cannot create directory link: {e}"),
        ));
    }
    run.enter(EngineState::JunctionCreated);

    run.enter(EngineState::Verifying);
    if let Err(detail) = verify_link(fs, source, target, moved) {
        let description = format!(
            "All data is in {}. The link at {} is suspect: inspect it with --inspect and, \
             if needed, remove it with --remove-junction and create it again.",
            target.display(),
            source.display()
        );
        return run.verification_failed(detail, description);
    }

    run.enter(EngineState::Done);
    info!(source = %source.display(), target = %target.display(), entries = moved, "relocation complete");
    RelocationOutcome::Success(source.to_path_buf())
}

fn verify_link<F: Filesystem + ?Sized>(
    fs: &F,
    link: &Path,
    target: &Path,
    expected: usize,
) -> Result<(), String> {
    let resolved = fs
        .resolve_link(link)
        .map_err(|e| format!("link does not resolve: {e}"))?;
    if !same_location(&resolved, target) {
        return Err(format!(
            "link resolves to {} instead of {}",
            resolved.display(),
            target.display()
        ));
    }
    let count = fs
        .list_entries(target)
        .map_err(|e| format!("cannot list {}: {e}", target.display()))?
        .len();
    if count != expected {
        return Err(format!(
            "{} holds {count} entries, expected {expected}",
            target.display()
        ));
    }
    Ok(())
}

/// Undo a relocation: replace the link at `link` with a real directory and
/// move the contents back from the link's target, which is then removed.
pub fn restore<F: Filesystem + ?Sized>(
    fs: &F,
    link: &Path,
    log: &mut OperationLog,
) -> RelocationOutcome {
    let mut run = Run::new(fs, log);
    info!(link = %link.display(), "restore started");

    let target = match fs.resolve_link(link) {
        Ok(t) => t,
        Err(e) => return precondition_failed(format!("cannot restore {}: {e}", link.display())),
    };
    if !fs::metadata(&target).map(|m| m.is_dir()).unwrap_or(false) {
        return precondition_failed(format!(
            "link target {} is not a directory",
            target.display()
        ));
    }

    run.enter(EngineState::CreatingJunction);
    run.record(OperationStep::RemovedJunction {
        path: link.to_path_buf(),
        target: target.clone(),
    });
    if let Err(e) = fs.remove_dir_link(link) {
        return run.fail_with_rollback(Failure::new(
            FailureKind::JunctionFailed,
            format!("cannot remove directory link: {e}"),
        ));
    }
    if let Err(e) = run.create_missing_dirs(link) {
        return run.fail_with_rollback(Failure::new(
            FailureKind::JunctionFailed,
            format!("cannot recreate {}: {e}", link.display()),
        ));
    }

    run.enter(EngineState::MovingContents);
    let moved = match run.move_all(&target, link) {
        Ok(n) => n,
        Err(cause) => return run.fail_with_rollback(cause),
    };
    run.enter(EngineState::ContentsMoved);

    run.record(OperationStep::DeletedOriginal {
        path: target.clone(),
    });
    if let Err(e) = fs.remove_empty_dir(&target) {
        return run.fail_with_rollback(Failure::new(
            FailureKind::JunctionFailed,
            format!("cannot remove emptied {}: {e}", target.display()),
        ));
    }

    run.enter(EngineState::Verifying);
    let count = fs.list_entries(link).map(|v| v.len());
    let mismatch = match count {
        _ if fs.is_dir_link(link) => Some(format!("{} is still a link", link.display())),
        Ok(n) if n != moved => Some(format!(
            "{} holds {n} entries, expected {moved}",
            link.display()
        )),
        Ok(_) => None,
        Err(e) => Some(format!("cannot list {}: {e}", link.display())),
    };
    if let Some(detail) = mismatch {
        let description = format!(
            "Contents were moved back to {}; check the folder by hand.",
            link.display()
        );
        return run.verification_failed(detail, description);
    }

    run.enter(EngineState::Done);
    info!(link = %link.display(), entries = moved, "restore complete");
    RelocationOutcome::Success(link.to_path_buf())
}
