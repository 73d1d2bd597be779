//! Path helpers shared by the validator, engine and inspector.
//!
//! Nothing in here mutates the filesystem.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute (relative to the current directory) and lexically clean.
/// Symlinks are not resolved, so a link at `path` stays a link.
pub fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }
    let abs = std::path::absolute(path)?;
    Ok(lexical_clean(&abs))
}

/// Drop `.` components and fold `..` into the preceding component.
/// `..` above the root is discarded.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_root {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Does anything (including a dangling link) exist at `path`?
pub fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Deepest ancestor of `path` (or `path` itself) that exists.
pub fn nearest_existing_ancestor(path: &Path) -> Option<&Path> {
    path.ancestors().find(|p| !p.as_os_str().is_empty() && path_exists(p))
}

/// Canonical form of `path`, even when its tail does not exist yet.
/// The deepest existing ancestor is canonicalized and the missing tail is
/// appended back, so links in existing parents are resolved.
pub fn real_path(path: &Path) -> PathBuf {
    let clean = lexical_clean(path);
    let Some(existing) = nearest_existing_ancestor(&clean).map(Path::to_path_buf) else {
        return clean;
    };
    let base = match dunce::canonicalize(&existing) {
        Ok(p) => p,
        Err(_) => return clean,
    };
    match clean.strip_prefix(&existing) {
        Ok(rest) if !rest.as_os_str().is_empty() => base.join(rest),
        _ => base,
    }
}

/// Case-fold a path for comparisons: Windows volumes are case-insensitive.
pub fn fold_case(path: &Path) -> OsString {
    #[cfg(windows)]
    {
        OsString::from(path.to_string_lossy().to_lowercase())
    }
    #[cfg(not(windows))]
    {
        path.as_os_str().to_owned()
    }
}

/// Do `a` and `b` name the same location once links and case are resolved?
pub fn same_location(a: &Path, b: &Path) -> bool {
    fold_case(&real_path(a)) == fold_case(&real_path(b))
}

/// Is `inner` equal to `outer` or somewhere below it (component-wise)?
/// Both paths are compared as given; callers resolve them first.
pub fn is_within(inner: &Path, outer: &Path) -> bool {
    let inner = PathBuf::from(fold_case(inner));
    let outer = PathBuf::from(fold_case(outer));
    inner.starts_with(&outer)
}

/// `/` on Unix, a drive or share root on Windows.
pub fn is_filesystem_root(path: &Path) -> bool {
    path.parent().is_none()
}
