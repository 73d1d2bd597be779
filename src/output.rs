//! User-facing output.
//! Small wrapper around stdout/stderr printing to provide consistent, colored
//! messages, plus the line layout for validation results, relocation outcomes
//! and junction listings. Colors are enabled only when output is a TTY.

use owo_colors::OwoColorize;

use crate::model::{JunctionRecord, RelocationOutcome, ValidationResult};

fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Print a plain user-facing line (no prefix), e.g. one junction per line
/// which users may script against.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

/// One line per failure, in check order.
pub fn validation_lines(result: &ValidationResult) -> Vec<String> {
    result
        .failures()
        .iter()
        .map(|f| format!("[{}] {}", f.kind(), f))
        .collect()
}

/// Every line needed to explain a non-successful outcome: the reason, each
/// recorded step, each failed undo and the residual description.
pub fn outcome_lines(outcome: &RelocationOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    match outcome {
        RelocationOutcome::Success(link) => {
            lines.push(format!("directory link in place at {}", link.display()));
        }
        RelocationOutcome::RolledBack { reason, steps } => {
            lines.push(format!("{reason} (code {})", reason.kind.code()));
            lines.push(format!("rolled back {} step(s):", steps.len()));
            lines.extend(steps.iter().map(|s| format!("  undone: {s}")));
        }
        RelocationOutcome::Failed { reason, residual } => {
            lines.push(format!("{reason} (code {})", reason.kind.code()));
            if let Some(cause) = &residual.cause {
                lines.push(format!("triggered by {cause}"));
            }
            lines.extend(residual.completed.iter().map(|s| format!("  completed: {s}")));
            lines.extend(
                residual
                    .rollback_failures
                    .iter()
                    .map(|rf| format!("  not undone: {} ({})", rf.step, rf.error)),
            );
            lines.push(residual.description.clone());
        }
    }
    lines
}

/// `link -> target [status]`, plus the link's creation time when known.
pub fn junction_line(record: &JunctionRecord) -> String {
    let mut line = format!(
        "{} -> {} [{}]",
        record.link_path.display(),
        record.real_target.display(),
        record.status
    );
    if let Some(created) = record.created {
        line.push_str(&format!(" created {}", created.format("%d/%m/%y %H:%M:%S")));
    }
    line
}

/// Non-blocking findings, one line each.
pub fn warning_lines(result: &ValidationResult) -> Vec<String> {
    result.warnings().iter().map(|w| w.to_string()).collect()
}

pub fn print_validation(result: &ValidationResult) {
    for line in warning_lines(result) {
        print_warn(&line);
    }
    if result.is_ok() {
        print_success("request is valid");
        return;
    }
    for line in validation_lines(result) {
        print_error(&line);
    }
}

pub fn print_outcome(outcome: &RelocationOutcome) {
    let mut lines = outcome_lines(outcome).into_iter();
    match outcome {
        RelocationOutcome::Success(_) => {
            if let Some(first) = lines.next() {
                print_success(&first);
            }
        }
        _ => lines.for_each(|l| print_error(&l)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FailureKind, FsError};
    use crate::model::{
        Failure, LinkStatus, OperationStep, ResidualState, RollbackFailure, ValidationFailure,
        ValidationWarning,
    };
    use chrono::{Local, TimeZone};
    use std::path::PathBuf;

    #[test]
    fn every_validation_failure_is_listed() {
        let r = ValidationResult::from_failures(vec![
            ValidationFailure::TargetNotEmpty {
                path: PathBuf::from("/t"),
                entries: 2,
            },
            ValidationFailure::ProtectedPath {
                path: PathBuf::from("/s"),
                reason: "system directory".into(),
            },
        ]);
        let lines = validation_lines(&r);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[target_not_empty]"));
        assert!(lines[1].starts_with("[protected_path]"));
    }

    #[test]
    fn failed_outcome_shows_steps_and_description() {
        let step = OperationStep::MovedContents {
            source: PathBuf::from("/s/a"),
            target: PathBuf::from("/t/a"),
        };
        let outcome = RelocationOutcome::Failed {
            reason: Failure::new(FailureKind::RollbackFailed, "1 step could not be undone"),
            residual: ResidualState {
                completed: vec![step.clone()],
                rollback_failures: vec![RollbackFailure {
                    step,
                    error: FsError::PermissionDenied {
                        path: PathBuf::from("/t/a"),
                        detail: "denied".into(),
                    },
                }],
                manual_recovery_required: true,
                cause: Some(Failure::new(FailureKind::MoveInterrupted, "disk full")),
                description: "MANUAL RECOVERY REQUIRED".into(),
            },
        };
        let lines = outcome_lines(&outcome);
        assert!(lines[0].contains("code 20"));
        assert!(lines.iter().any(|l| l.contains("triggered by move_interrupted")));
        assert!(lines.iter().any(|l| l.starts_with("  completed:")));
        assert!(lines.iter().any(|l| l.starts_with("  not undone:")));
        assert_eq!(lines.last().unwrap(), "MANUAL RECOVERY REQUIRED");
    }

    #[test]
    fn junction_line_shows_status() {
        let r = JunctionRecord::new("/l".into(), "/gone".into(), LinkStatus::Dangling);
        assert_eq!(junction_line(&r), "/l -> /gone [dangling]");

        let created = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let r = r.with_created(Some(created));
        assert_eq!(junction_line(&r), "/l -> /gone [dangling] created 05/03/24 14:07:09");
    }

    #[test]
    fn warnings_do_not_make_a_result_fail() {
        let r = ValidationResult::from_failures(Vec::new()).with_warnings(vec![
            ValidationWarning::OutsideSyncRoot {
                target: PathBuf::from("/data/t"),
                sync_root: PathBuf::from("/home/me/OneDrive"),
            },
        ]);
        assert!(r.is_ok());
        let lines = warning_lines(&r);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("/home/me/OneDrive"), "{}", lines[0]);
    }
}
