//! Cross-device fallback: copy an entry tree, then remove the original.
//! - Links inside the tree are recreated, never followed
//! - File modification times are carried over (best-effort)
//! - A failed copy removes its partial destination, so an entry is never
//!   left in both places

use filetime::FileTime;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::helpers::classify_io_error;
use crate::errors::FsError;
use crate::platform;

/// Copy `from` (file, directory or link) to the absent path `to`, then remove `from`.
pub fn copy_then_remove(from: &Path, to: &Path) -> Result<(), FsError> {
    let meta = fs::symlink_metadata(from).map_err(|e| classify_io_error("stat", from, e))?;

    if let Err(e) = copy_entry(from, to, &meta) {
        if let Err(cleanup) = remove_any(to) {
            warn!(dest = %to.display(), error = %cleanup, "failed to remove partial copy");
        }
        return Err(e);
    }

    remove_any(from).map_err(|e| classify_io_error("remove original after copy", from, e))?;
    debug!(src = %from.display(), dest = %to.display(), "copied entry across devices and removed source");
    Ok(())
}

fn copy_entry(from: &Path, to: &Path, meta: &fs::Metadata) -> Result<(), FsError> {
    let ft = meta.file_type();
    if ft.is_symlink() {
        return platform::copy_link(from, to).map_err(|e| classify_io_error("copy link", to, e));
    }
    if ft.is_file() {
        return copy_file(from, to, meta);
    }

    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| {
            let at = e.path().unwrap_or(from).to_path_buf();
            match e.into_io_error() {
                Some(io) => classify_io_error("walk source tree", &at, io),
                None => FsError::Io {
                    detail: format!("walk source tree '{}': link loop", at.display()),
                    path: at,
                },
            }
        })?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|_| FsError::Io {
                path: entry.path().to_path_buf(),
                detail: "entry outside of source tree".into(),
            })?;
        let dst = if rel.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(rel)
        };
        let ft = entry.file_type();
        if ft.is_dir() {
            fs::create_dir(&dst).map_err(|e| classify_io_error("create directory", &dst, e))?;
        } else if ft.is_symlink() {
            platform::copy_link(entry.path(), &dst)
                .map_err(|e| classify_io_error("copy link", &dst, e))?;
        } else {
            let meta = entry
                .metadata()
                .map_err(|e| FsError::Io {
                    path: entry.path().to_path_buf(),
                    detail: e.to_string(),
                })?;
            copy_file(entry.path(), &dst, &meta)?;
        }
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path, meta: &fs::Metadata) -> Result<(), FsError> {
    fs::copy(from, to).map_err(|e| classify_io_error("copy file", to, e))?;
    let mtime = FileTime::from_last_modification_time(meta);
    if let Err(e) = filetime::set_file_mtime(to, mtime) {
        warn!(path = %to.display(), error = %e, "failed to preserve modification time");
    }
    Ok(())
}

/// Remove whatever is at `path` without following links.
fn remove_any(path: &Path) -> std::io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let ft = meta.file_type();
    if platform::is_dir_link_type(&ft) {
        platform::remove_dir_link(path)
    } else if ft.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
