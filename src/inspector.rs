//! Junction inspector: read-only discovery and classification of directory links.
//!
//! Every call re-reads the filesystem; records are never cached, because the
//! link or its target can change between two calls.

use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::NotAJunction;
use crate::fs_ops::link_target;
use crate::model::{JunctionRecord, LinkStatus};
use crate::platform;

/// How deep below each scan root links are looked for.
pub const DEFAULT_SCAN_DEPTH: usize = 2;

/// Resolve and classify the directory link at `path`.
pub fn inspect_one(path: &Path) -> Result<JunctionRecord, NotAJunction> {
    let not_a_junction = || NotAJunction {
        path: path.to_path_buf(),
    };
    let meta = fs::symlink_metadata(path).map_err(|_| not_a_junction())?;
    if !platform::is_dir_link_type(&meta.file_type()) {
        return Err(not_a_junction());
    }

    // Birth time of the link itself; not every filesystem keeps one.
    let created = meta.created().ok().map(DateTime::<Local>::from);
    let record = match link_target(path) {
        Ok(target) => {
            let status = classify_target(&target);
            JunctionRecord::new(path.to_path_buf(), target, status)
        }
        Err(e) => {
            debug!(link = %path.display(), error = %e, "link target unreadable");
            JunctionRecord::new(path.to_path_buf(), PathBuf::new(), LinkStatus::Unreadable)
        }
    }
    .with_created(created);
    debug!(link = %record.link_path.display(), target = %record.real_target.display(), status = %record.status, "inspected link");
    Ok(record)
}

/// Valid means an existing directory the current user can list.
pub(crate) fn classify_target(target: &Path) -> LinkStatus {
    match fs::metadata(target) {
        Ok(m) if m.is_dir() => {
            if platform::can_list_dir(target) {
                LinkStatus::Valid
            } else {
                LinkStatus::Unreadable
            }
        }
        Ok(_) => LinkStatus::Misdirected,
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => LinkStatus::Dangling,
            _ => LinkStatus::Unreadable,
        },
    }
}

/// Lazily scan `roots` for directory links, at most `max_depth` levels down.
/// Links are reported, never descended into. Missing roots are skipped.
pub fn list_junctions(roots: Vec<PathBuf>, max_depth: usize) -> JunctionScan {
    JunctionScan {
        roots: roots.into_iter(),
        current: None,
        max_depth,
    }
}

/// Iterator returned by [`list_junctions`]. Finite; call `list_junctions`
/// again to rescan.
pub struct JunctionScan {
    roots: std::vec::IntoIter<PathBuf>,
    current: Option<walkdir::IntoIter>,
    max_depth: usize,
}

impl Iterator for JunctionScan {
    type Item = JunctionRecord;

    fn next(&mut self) -> Option<JunctionRecord> {
        loop {
            if let Some(walker) = self.current.as_mut() {
                for entry in walker.by_ref() {
                    let entry = match entry {
                        Ok(e) => e,
                        Err(e) => {
                            debug!(error = %e, "skipping unreadable entry during scan");
                            continue;
                        }
                    };
                    if !platform::is_dir_link_type(&entry.file_type()) {
                        continue;
                    }
                    if let Ok(record) = inspect_one(entry.path()) {
                        return Some(record);
                    }
                }
                self.current = None;
            }

            let root = self.roots.next()?;
            if !root.is_dir() {
                warn!(root = %root.display(), "scan root is not a directory; skipping");
                continue;
            }
            debug!(root = %root.display(), depth = self.max_depth, "scanning for directory links");
            self.current = Some(
                WalkDir::new(root)
                    .min_depth(1)
                    .max_depth(self.max_depth)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter(),
            );
        }
    }
}

/// The user folders links usually live in (Documents, Desktop, Downloads,
/// Pictures, Videos, Music), plus Program Files and Users on Windows.
/// Only folders that exist are returned.
pub fn default_scan_roots() -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = [
        dirs::document_dir(),
        dirs::desktop_dir(),
        dirs::download_dir(),
        dirs::picture_dir(),
        dirs::video_dir(),
        dirs::audio_dir(),
    ]
    .into_iter()
    .flatten()
    .collect();

    #[cfg(windows)]
    {
        if let Some(pf) = std::env::var_os("ProgramFiles") {
            roots.push(PathBuf::from(pf));
        }
        let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".into());
        roots.push(PathBuf::from(format!("{drive}\\Users")));
    }

    // XDG folders can all fall back to $HOME; keep the first of each.
    let mut seen = std::collections::HashSet::new();
    roots.retain(|r| r.is_dir() && seen.insert(r.clone()));
    roots
}
