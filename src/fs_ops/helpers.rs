//! I/O helper utilities.
//!
//! Turns io::Error into the typed `FsError` the engine understands, and
//! enriches messages with actionable hints.
//!
//! Usage:
//!   // in functions returning Result<_, FsError>
//!   fs::rename(a, b).map_err(|e| classify_io_error("move entry", a, e))?;
//!
//!   // in functions returning anyhow::Result<_>
//!   fs::create_dir_all(dir).map_err(io_error_with_help("create dir", dir))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

use crate::errors::FsError;

#[cfg(windows)]
const ERROR_NOT_SAME_DEVICE: i32 = 17;
#[cfg(windows)]
const ERROR_PRIVILEGE_NOT_HELD: i32 = 1314;
#[cfg(windows)]
const ERROR_INVALID_FUNCTION: i32 = 1;
#[cfg(windows)]
const ERROR_NOT_A_REPARSE_POINT: i32 = 4390;

/// Format a human-friendly message with op/path plus platform-aware hints.
fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);

    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            match code {
                libc::EACCES | libc::EPERM => {
                    msg.push_str("; permission denied, check ownership and write permissions");
                }
                libc::EXDEV => {
                    msg.push_str("; cross-filesystem, a plain rename is not possible");
                }
                libc::EBUSY => {
                    msg.push_str("; resource busy, close programs using this folder");
                }
                libc::ENOENT => {
                    msg.push_str("; path not found, verify it exists");
                }
                libc::EEXIST | libc::ENOTEMPTY => {
                    msg.push_str("; already exists, remove it or pick another target");
                }
                libc::ENOSPC => {
                    msg.push_str("; insufficient space on device");
                }
                libc::EROFS => {
                    msg.push_str("; read-only filesystem, cannot write here");
                }
                libc::ELOOP => {
                    msg.push_str("; too many symbolic link levels, possible link cycle");
                }
                libc::ENAMETOOLONG => {
                    msg.push_str("; filename or path too long, shorten path segments");
                }
                _ => {}
            }
        }
        #[cfg(windows)]
        {
            match code {
                5 => msg.push_str("; access denied, check permissions"),
                ERROR_NOT_SAME_DEVICE => msg.push_str("; not same device, cross-filesystem move"),
                32 => msg.push_str("; sharing violation, a file is in use"),
                2 | 3 => msg.push_str("; path not found, verify it exists"),
                80 | 183 => msg.push_str("; already exists, pick another target"),
                112 => msg.push_str("; insufficient disk space"),
                19 => msg.push_str("; write protected / read-only media"),
                206 => msg.push_str("; filename or path too long"),
                ERROR_PRIVILEGE_NOT_HELD => {
                    msg.push_str("; privilege not held, run elevated or enable Developer Mode")
                }
                _ => {}
            }
        }
        msg.push_str(&format!(" [os code: {}]", code));
    } else {
        match e.kind() {
            io::ErrorKind::PermissionDenied => {
                msg.push_str("; permission denied, check ownership and write permissions");
            }
            io::ErrorKind::NotFound => {
                msg.push_str("; path not found, verify it exists");
            }
            io::ErrorKind::AlreadyExists => {
                msg.push_str("; already exists, remove it or pick another target");
            }
            _ => {}
        }
    }

    msg
}

fn is_cross_device(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::CrossesDevices {
        return true;
    }
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(libc::EXDEV)
    }
    #[cfg(windows)]
    {
        e.raw_os_error() == Some(ERROR_NOT_SAME_DEVICE)
    }
}

fn is_unsupported(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::Unsupported {
        return true;
    }
    #[cfg(unix)]
    {
        matches!(e.raw_os_error(), Some(libc::EOPNOTSUPP) | Some(libc::ENOSYS))
    }
    #[cfg(windows)]
    {
        matches!(
            e.raw_os_error(),
            Some(ERROR_INVALID_FUNCTION) | Some(ERROR_NOT_A_REPARSE_POINT)
        )
    }
}

fn is_privilege_error(e: &io::Error) -> bool {
    #[cfg(windows)]
    {
        e.raw_os_error() == Some(ERROR_PRIVILEGE_NOT_HELD)
    }
    #[cfg(not(windows))]
    {
        let _ = e;
        false
    }
}

/// Map an io::Error from operation `op` on `path` to the nearest `FsError`.
pub fn classify_io_error(op: &str, path: &Path, e: io::Error) -> FsError {
    let path = path.to_path_buf();
    if is_cross_device(&e) {
        return FsError::CrossDevice { path };
    }
    if is_unsupported(&e) {
        let detail = build_message(op, &path, &e);
        return FsError::UnsupportedFilesystem { path, detail };
    }
    if is_privilege_error(&e) {
        let detail = build_message(op, &path, &e);
        return FsError::PermissionDenied { path, detail };
    }
    match e.kind() {
        io::ErrorKind::NotFound => FsError::NotFound { path },
        io::ErrorKind::AlreadyExists => FsError::AlreadyExists { path },
        io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
            let detail = build_message(op, &path, &e);
            FsError::PermissionDenied { path, detail }
        }
        _ => {
            let detail = build_message(op, &path, &e);
            FsError::Io { path, detail }
        }
    }
}

/// Adapter for anyhow::Result code.
/// Returns a closure suitable for `.map_err(...)` that converts io::Error -> anyhow::Error.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}
