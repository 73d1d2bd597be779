//! Unix implementations of platform helpers.
//! A directory link is a plain symlink; access checks go through access(2).

use anyhow::{Context, Result, bail};
use std::ffi::CString;
use std::fs::{self, File, FileType, OpenOptions};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use super::temp::tmp_sibling_name;

/// Longest path the OS accepts, in bytes.
pub const MAX_PATH_LEN: usize = libc::PATH_MAX as usize;

pub fn path_len(path: &Path) -> usize {
    path.as_os_str().len()
}

/// Every symlink is a candidate directory link; the inspector classifies
/// links that do not end at a directory.
pub fn is_dir_link_type(ft: &FileType) -> bool {
    ft.is_symlink()
}

pub fn create_dir_link(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Remove the link itself, never the directory it points to.
pub fn remove_dir_link(link: &Path) -> io::Result<()> {
    fs::remove_file(link)
}

pub fn read_dir_link(link: &Path) -> io::Result<PathBuf> {
    fs::read_link(link)
}

/// Recreate the link at `from` as a new link at `to` with the same raw target.
pub fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(from)?;
    std::os::unix::fs::symlink(target, to)
}

fn access_ok(path: &Path, mode: libc::c_int) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

/// Can the current user list `path`?
pub fn can_list_dir(path: &Path) -> bool {
    access_ok(path, libc::R_OK | libc::X_OK)
}

/// Can the current user add and remove entries in `path`?
pub fn can_modify_dir(path: &Path) -> bool {
    access_ok(path, libc::W_OK | libc::X_OK)
}

pub fn platform_protected_trees() -> Vec<PathBuf> {
    [
        "/bin", "/boot", "/dev", "/etc", "/lib", "/lib32", "/lib64", "/libx32", "/proc", "/run",
        "/sbin", "/sys", "/usr", "/System", "/Library",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

pub fn platform_protected_exact() -> Vec<PathBuf> {
    [
        "/home",
        "/root",
        "/tmp",
        "/var",
        "/opt",
        "/mnt",
        "/media",
        "/srv",
        "/Users",
        "/Applications",
        "/Volumes",
        "/private",
        "/private/var",
        "/private/tmp",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

/// Append handle for the log file. A file we create is private (0600);
/// an existing file keeps whatever mode the user gave it.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    // mode() only applies on creation and is still subject to the umask.
    let fresh = fs::symlink_metadata(path).is_err();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .mode(0o600)
        .open(path)?;
    if fresh {
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}

/// Publish a new private (0600) config file. The bytes are written and
/// synced under a scratch name first, so readers never see a torn file.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    if fs::symlink_metadata(path).is_ok() {
        bail!("{} already exists", path.display());
    }
    let Some(dir) = path.parent() else {
        bail!("{} has no parent directory", path.display());
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let scratch = tmp_sibling_name(path);
    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(&scratch)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&scratch, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&scratch);
        return Err(e).with_context(|| format!("writing {}", path.display()));
    }

    // Make the rename itself durable.
    File::open(dir)
        .and_then(|d| d.sync_all())
        .with_context(|| format!("syncing {}", dir.display()))
}

/// Restrict a config directory to its owner.
pub fn set_dir_mode_0700(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}
