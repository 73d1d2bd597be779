//! Filesystem capability interface.
//!
//! The engine never calls `std::fs` directly for mutations: it goes through
//! `Filesystem`, so tests can inject failures and the OS primitives stay in
//! one place. `NativeFs` is the real implementation.

mod copy;
mod helpers;

pub use copy::copy_then_remove;
pub use helpers::{classify_io_error, io_error_with_help};

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::FsError;
use crate::platform;
use crate::utils::{lexical_clean, path_exists};

/// Primitive operations the relocation engine is built on.
pub trait Filesystem {
    /// Move one directory entry (file, directory or link) to the absent path `to`.
    fn move_entry(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Create a directory link at the absent path `link` pointing to `target`.
    fn create_dir_link(&self, link: &Path, target: &Path) -> Result<(), FsError>;

    /// Remove the directory link at `link`, leaving its target alone.
    fn remove_dir_link(&self, link: &Path) -> Result<(), FsError>;

    /// Absolute target of the link at `link`; `NotALink` or `Dangling` otherwise.
    fn resolve_link(&self, link: &Path) -> Result<PathBuf, FsError>;

    fn is_dir_link(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    fn create_dir(&self, path: &Path) -> Result<(), FsError>;

    /// Remove `path`, which must be an empty directory.
    fn remove_empty_dir(&self, path: &Path) -> Result<(), FsError>;

    /// Top-level entries of `dir`, sorted by name.
    fn list_entries(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError>;
}

impl<T: Filesystem + ?Sized> Filesystem for &T {
    fn move_entry(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        (**self).move_entry(from, to)
    }
    fn create_dir_link(&self, link: &Path, target: &Path) -> Result<(), FsError> {
        (**self).create_dir_link(link, target)
    }
    fn remove_dir_link(&self, link: &Path) -> Result<(), FsError> {
        (**self).remove_dir_link(link)
    }
    fn resolve_link(&self, link: &Path) -> Result<PathBuf, FsError> {
        (**self).resolve_link(link)
    }
    fn is_dir_link(&self, path: &Path) -> bool {
        (**self).is_dir_link(path)
    }
    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        (**self).create_dir(path)
    }
    fn remove_empty_dir(&self, path: &Path) -> Result<(), FsError> {
        (**self).remove_empty_dir(path)
    }
    fn list_entries(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError> {
        (**self).list_entries(dir)
    }
}

/// Is the entry at `path` (not following links) a directory link?
pub fn is_dir_link(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| platform::is_dir_link_type(&m.file_type()))
        .unwrap_or(false)
}

/// Raw target of the link at `link`, made absolute against the link's parent.
pub fn link_target(link: &Path) -> Result<PathBuf, FsError> {
    let raw = platform::read_dir_link(link).map_err(|e| classify_io_error("read link", link, e))?;
    if raw.is_absolute() {
        return Ok(lexical_clean(&raw));
    }
    let parent = link.parent().unwrap_or_else(|| Path::new(""));
    Ok(lexical_clean(&parent.join(raw)))
}

/// Filesystem backed by the operating system.
#[derive(Debug, Clone, Copy)]
pub struct NativeFs {
    copy_across_devices: bool,
}

impl Default for NativeFs {
    fn default() -> Self {
        Self {
            copy_across_devices: true,
        }
    }
}

impl NativeFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// When false, moves between volumes fail with `CrossDevice` instead of copying.
    pub fn with_copy_across_devices(mut self, enabled: bool) -> Self {
        self.copy_across_devices = enabled;
        self
    }
}

impl Filesystem for NativeFs {
    fn move_entry(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::symlink_metadata(from).map_err(|e| classify_io_error("move entry", from, e))?;
        // rename(2) silently replaces files and empty directories.
        if path_exists(to) {
            return Err(FsError::AlreadyExists {
                path: to.to_path_buf(),
            });
        }
        match fs::rename(from, to) {
            Ok(()) => {
                debug!(src = %from.display(), dest = %to.display(), "renamed entry");
                Ok(())
            }
            Err(e) => match classify_io_error("move entry", from, e) {
                FsError::CrossDevice { .. } if self.copy_across_devices => {
                    warn!(src = %from.display(), dest = %to.display(), "rename crosses devices, falling back to copy+remove");
                    copy_then_remove(from, to)
                }
                other => Err(other),
            },
        }
    }

    fn create_dir_link(&self, link: &Path, target: &Path) -> Result<(), FsError> {
        if path_exists(link) {
            return Err(FsError::AlreadyExists {
                path: link.to_path_buf(),
            });
        }
        platform::create_dir_link(link, target)
            .map_err(|e| classify_io_error("create directory link", link, e))
    }

    fn remove_dir_link(&self, link: &Path) -> Result<(), FsError> {
        let meta =
            fs::symlink_metadata(link).map_err(|e| classify_io_error("remove link", link, e))?;
        if !platform::is_dir_link_type(&meta.file_type()) {
            return Err(FsError::NotALink {
                path: link.to_path_buf(),
            });
        }
        platform::remove_dir_link(link).map_err(|e| classify_io_error("remove link", link, e))
    }

    fn resolve_link(&self, link: &Path) -> Result<PathBuf, FsError> {
        let meta =
            fs::symlink_metadata(link).map_err(|e| classify_io_error("resolve link", link, e))?;
        if !platform::is_dir_link_type(&meta.file_type()) {
            return Err(FsError::NotALink {
                path: link.to_path_buf(),
            });
        }
        let target = link_target(link)?;
        if !path_exists(&target) {
            return Err(FsError::Dangling {
                path: link.to_path_buf(),
                target,
            });
        }
        Ok(target)
    }

    fn is_dir_link(&self, path: &Path) -> bool {
        is_dir_link(path)
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path).map_err(|e| classify_io_error("create directory", path, e))
    }

    fn remove_empty_dir(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_dir(path).map_err(|e| classify_io_error("remove directory", path, e))
    }

    fn list_entries(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError> {
        let rd = fs::read_dir(dir).map_err(|e| classify_io_error("list directory", dir, e))?;
        let mut out = Vec::new();
        for entry in rd {
            let entry = entry.map_err(|e| classify_io_error("list directory", dir, e))?;
            out.push(entry.path());
        }
        out.sort();
        Ok(out)
    }
}
