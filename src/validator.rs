//! Path validator: pre-flight checks for a relocation request.
//!
//! Pure inspection. Every check runs and failures accumulate, so the caller
//! can show the user every problem at once. No probe files are written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::fs_ops::{is_dir_link, link_target};
use crate::model::{RelocationRequest, ValidationFailure, ValidationResult, ValidationWarning};
use crate::platform;
use crate::utils::{fold_case, is_filesystem_root, is_within, nearest_existing_ancestor, real_path};

/// Check `request` against every precondition of a relocation.
pub fn validate(request: &RelocationRequest) -> ValidationResult {
    let source = request.source.as_path();
    let target = request.target.as_path();
    debug!(source = %source.display(), target = %target.display(), "validating request");

    let mut failures = Vec::new();
    check_source(source, &mut failures);
    check_target(target, &mut failures);
    check_length(source, &mut failures);
    check_length(target, &mut failures);
    check_overlap(source, target, &mut failures);
    check_protected(source, &request.options.protected_paths, &mut failures);
    check_protected(target, &request.options.protected_paths, &mut failures);
    check_permissions(source, target, &mut failures);
    check_free_space(target, request.options.min_free_space, &mut failures);

    let warnings = sync_root_warnings(target, request.options.sync_root.as_deref());
    for w in &warnings {
        warn!("{w}");
    }

    if failures.is_empty() {
        info!(source = %source.display(), target = %target.display(), "request validated");
    } else {
        for f in &failures {
            warn!(kind = f.kind(), "{f}");
        }
    }
    ValidationResult::from_failures(failures).with_warnings(warnings)
}

fn check_source(source: &Path, failures: &mut Vec<ValidationFailure>) {
    match fs::metadata(source) {
        Ok(m) if m.is_dir() => {}
        Ok(_) => failures.push(ValidationFailure::NotADirectory {
            path: source.to_path_buf(),
            reason: "source is not a directory".into(),
        }),
        Err(e) => failures.push(ValidationFailure::NotADirectory {
            path: source.to_path_buf(),
            reason: describe_missing(source, &e),
        }),
    }

    if is_dir_link(source) {
        failures.push(ValidationFailure::AlreadyLinked {
            path: source.to_path_buf(),
            target: link_target(source).ok(),
        });
    }
}

fn describe_missing(path: &Path, e: &io::Error) -> String {
    if e.kind() == io::ErrorKind::NotFound {
        if is_dir_link(path) {
            "link target does not exist".into()
        } else {
            "does not exist".into()
        }
    } else {
        format!("cannot be read: {e}")
    }
}

fn check_target(target: &Path, failures: &mut Vec<ValidationFailure>) {
    match fs::symlink_metadata(target) {
        Ok(m) if platform::is_dir_link_type(&m.file_type()) => {
            failures.push(ValidationFailure::NotADirectory {
                path: target.to_path_buf(),
                reason: "target is a directory link; expected a real directory".into(),
            });
        }
        Ok(m) if m.is_dir() => match fs::read_dir(target) {
            Ok(rd) => {
                let entries = rd.count();
                if entries > 0 {
                    failures.push(ValidationFailure::TargetNotEmpty {
                        path: target.to_path_buf(),
                        entries,
                    });
                }
            }
            Err(e) => failures.push(ValidationFailure::NotADirectory {
                path: target.to_path_buf(),
                reason: format!("cannot be listed: {e}"),
            }),
        },
        Ok(_) => failures.push(ValidationFailure::NotADirectory {
            path: target.to_path_buf(),
            reason: "target exists and is not a directory".into(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let parent = target.parent().unwrap_or(target);
            match nearest_existing_ancestor(parent) {
                Some(anc) if anc.is_dir() => {}
                Some(anc) => failures.push(ValidationFailure::NotADirectory {
                    path: anc.to_path_buf(),
                    reason: "target parent cannot be created: path is not a directory".into(),
                }),
                None => failures.push(ValidationFailure::NotADirectory {
                    path: target.to_path_buf(),
                    reason: "no existing parent directory".into(),
                }),
            }
        }
        Err(e) => failures.push(ValidationFailure::NotADirectory {
            path: target.to_path_buf(),
            reason: format!("cannot be read: {e}"),
        }),
    }
}

fn check_length(path: &Path, failures: &mut Vec<ValidationFailure>) {
    let length = platform::path_len(&resolved(path)).max(platform::path_len(path));
    if length > platform::MAX_PATH_LEN {
        failures.push(ValidationFailure::PathTooLong {
            path: path.to_path_buf(),
            length,
            limit: platform::MAX_PATH_LEN,
        });
    }
}

fn sync_root_warnings(target: &Path, sync_root: Option<&Path>) -> Vec<ValidationWarning> {
    match sync_root {
        Some(root) if !is_within(&resolved(target), &real_path(root)) && !is_within(target, root) => {
            vec![ValidationWarning::OutsideSyncRoot {
                target: target.to_path_buf(),
                sync_root: root.to_path_buf(),
            }]
        }
        _ => Vec::new(),
    }
}

/// Canonical parent joined with the unresolved final component, so a link
/// at `path` itself is not followed.
fn resolved(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => real_path(parent).join(name),
        _ => real_path(path),
    }
}

/// Are the two paths equal, or is one inside the other?
pub(crate) fn paths_overlap(source: &Path, target: &Path) -> bool {
    let s = resolved(source);
    let t = resolved(target);
    is_within(&t, &s) || is_within(&s, &t)
}

fn check_overlap(source: &Path, target: &Path, failures: &mut Vec<ValidationFailure>) {
    if paths_overlap(source, target) {
        failures.push(ValidationFailure::OverlappingPaths {
            source_path: source.to_path_buf(),
            target_path: target.to_path_buf(),
        });
    }
}

fn protection_reason(path: &Path, extra: &[PathBuf]) -> Option<String> {
    let p = resolved(path);
    if is_filesystem_root(&p) || is_filesystem_root(path) {
        return Some("filesystem root".into());
    }
    for tree in platform::protected_trees().iter().chain(extra) {
        if is_within(&p, &real_path(tree)) || is_within(path, tree) {
            return Some(format!("inside protected directory {}", tree.display()));
        }
    }
    let folded = fold_case(&p);
    for exact in platform::protected_exact() {
        if folded == fold_case(&real_path(&exact)) || fold_case(path) == fold_case(&exact) {
            return Some("protected system directory".into());
        }
    }
    None
}

fn check_protected(path: &Path, extra: &[PathBuf], failures: &mut Vec<ValidationFailure>) {
    if let Some(reason) = protection_reason(path, extra) {
        failures.push(ValidationFailure::ProtectedPath {
            path: path.to_path_buf(),
            reason,
        });
    }
}

fn check_permissions(source: &Path, target: &Path, failures: &mut Vec<ValidationFailure>) {
    let mut deny = |path: &Path, needed: &str| {
        failures.push(ValidationFailure::PermissionDenied {
            path: path.to_path_buf(),
            needed: needed.into(),
        })
    };

    if source.is_dir() && !is_dir_link(source) {
        if !platform::can_list_dir(source) {
            deny(source, "read");
        }
        if !platform::can_modify_dir(source) {
            deny(source, "write/delete");
        }
        if let Some(parent) = source.parent() {
            if !platform::can_modify_dir(parent) {
                deny(parent, "write (to replace the source with a link)");
            }
        }
    }

    if target.is_dir() {
        if !platform::can_modify_dir(target) {
            deny(target, "write");
        }
    } else if let Some(anc) = target.parent().and_then(nearest_existing_ancestor) {
        if anc.is_dir() && !platform::can_modify_dir(anc) {
            deny(anc, "write/create");
        }
    }
}

fn check_free_space(target: &Path, required: u64, failures: &mut Vec<ValidationFailure>) {
    if required == 0 {
        return;
    }
    let Some(anc) = nearest_existing_ancestor(target) else {
        return;
    };
    match fs2::available_space(anc) {
        Ok(available) if available < required => {
            failures.push(ValidationFailure::InsufficientSpace {
                path: anc.to_path_buf(),
                required,
                available,
            });
        }
        Ok(_) => {}
        Err(e) => warn!(path = %anc.display(), error = %e, "could not determine free space; skipping check"),
    }
}
