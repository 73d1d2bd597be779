//! Windows implementations of platform helpers.
//!
//! Notes:
//! - Directory links are NTFS junctions (mount-point reparse points). Unlike
//!   directory symlinks they need no special privilege to create.
//! - Windows lacks POSIX mode semantics; we do not attempt ACL management here.
//! - Config writes are done via temp + rename to be atomic.

use anyhow::{Result, bail};
use std::ffi::OsStr;
use std::fs::{self, File, FileType, OpenOptions};
use std::io::{self, Write};
use std::os::windows::ffi::OsStrExt;
use std::os::windows::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::ptr;

use windows_sys::Win32::Foundation::{CloseHandle, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::CreateFileW;
use windows_sys::Win32::System::IO::DeviceIoControl;

use super::temp::tmp_sibling_name;

const GENERIC_WRITE: u32 = 0x4000_0000;
const FILE_SHARE_READ: u32 = 0x0000_0001;
const FILE_SHARE_WRITE: u32 = 0x0000_0002;
const OPEN_EXISTING: u32 = 3;
const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;
const FILE_FLAG_OPEN_REPARSE_POINT: u32 = 0x0020_0000;
const FSCTL_SET_REPARSE_POINT: u32 = 0x0009_00A4;
const IO_REPARSE_TAG_MOUNT_POINT: u32 = 0xA000_0003;

/// Classic MAX_PATH; long-path support is opt-in per machine, so it is not assumed.
pub const MAX_PATH_LEN: usize = 260;

/// Length in UTF-16 units, as Win32 counts it.
pub fn path_len(path: &Path) -> usize {
    path.as_os_str().encode_wide().count()
}

/// Junctions and directory symlinks both count as directory links.
pub fn is_dir_link_type(ft: &FileType) -> bool {
    ft.is_symlink_dir()
}

fn wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(std::iter::once(0)).collect()
}

/// Mount-point REPARSE_DATA_BUFFER: header, four u16 name offsets/lengths,
/// then substitute name and print name, each NUL-terminated.
fn mount_point_buffer(target: &Path) -> Vec<u8> {
    let print: Vec<u16> = target.as_os_str().encode_wide().collect();
    let mut substitute: Vec<u16> = OsStr::new(r"\??\").encode_wide().collect();
    substitute.extend_from_slice(&print);

    let sub_bytes = (substitute.len() * 2) as u16;
    let print_bytes = (print.len() * 2) as u16;
    // Offsets/lengths block plus both names and their terminators.
    let data_len = 8 + sub_bytes + 2 + print_bytes + 2;

    let mut buf = Vec::with_capacity(8 + data_len as usize);
    buf.extend_from_slice(&IO_REPARSE_TAG_MOUNT_POINT.to_le_bytes());
    buf.extend_from_slice(&data_len.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&sub_bytes.to_le_bytes());
    buf.extend_from_slice(&(sub_bytes + 2).to_le_bytes());
    buf.extend_from_slice(&print_bytes.to_le_bytes());
    for unit in substitute.iter().chain([0u16].iter()) {
        buf.extend_from_slice(&unit.to_le_bytes());
    }
    for unit in print.iter().chain([0u16].iter()) {
        buf.extend_from_slice(&unit.to_le_bytes());
    }
    buf
}

fn set_mount_point(link: &Path, target: &Path) -> io::Result<()> {
    let name = wide(link.as_os_str());
    // SAFETY: `name` is NUL-terminated and outlives the call.
    let handle = unsafe {
        CreateFileW(
            name.as_ptr(),
            GENERIC_WRITE,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            ptr::null(),
            OPEN_EXISTING,
            FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OPEN_REPARSE_POINT,
            ptr::null_mut(),
        )
    };
    if handle == INVALID_HANDLE_VALUE {
        return Err(io::Error::last_os_error());
    }

    let buf = mount_point_buffer(target);
    let mut returned = 0u32;
    // SAFETY: the handle is valid and `buf` is a well-formed reparse buffer.
    let ok = unsafe {
        DeviceIoControl(
            handle,
            FSCTL_SET_REPARSE_POINT,
            buf.as_ptr().cast(),
            buf.len() as u32,
            ptr::null_mut(),
            0,
            &mut returned,
            ptr::null_mut(),
        )
    };
    let err = (ok == 0).then(io::Error::last_os_error);
    // SAFETY: handle came from CreateFileW above and is closed exactly once.
    unsafe { CloseHandle(handle) };
    match err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Create a junction at `link` pointing to the absolute `target`.
/// The link directory is created first and removed again if the reparse
/// point cannot be set.
pub fn create_dir_link(link: &Path, target: &Path) -> io::Result<()> {
    let target = std::path::absolute(target)?;
    let target = dunce::simplified(&target).to_path_buf();
    fs::create_dir(link)?;
    if let Err(e) = set_mount_point(link, &target) {
        let _ = fs::remove_dir(link);
        return Err(e);
    }
    Ok(())
}

/// Removing a junction with remove_dir leaves its target untouched.
pub fn remove_dir_link(link: &Path) -> io::Result<()> {
    fs::remove_dir(link)
}

pub fn read_dir_link(link: &Path) -> io::Result<PathBuf> {
    let raw = fs::read_link(link)?;
    Ok(dunce::simplified(&raw).to_path_buf())
}

/// Recreate the link at `from` at `to`: junctions and directory links become
/// junctions, file symlinks stay file symlinks.
pub fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    let ft = fs::symlink_metadata(from)?.file_type();
    if ft.is_symlink_dir() {
        let target = read_dir_link(from)?;
        create_dir_link(to, &target)
    } else {
        std::os::windows::fs::symlink_file(fs::read_link(from)?, to)
    }
}

pub fn can_list_dir(path: &Path) -> bool {
    fs::read_dir(path).is_ok()
}

/// Best-effort: ACLs are not inspected, only the readonly attribute.
pub fn can_modify_dir(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

fn system_drive() -> PathBuf {
    let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".into());
    PathBuf::from(format!("{drive}\\"))
}

pub fn platform_protected_trees() -> Vec<PathBuf> {
    let drive = system_drive();
    let system_root = std::env::var_os("SystemRoot")
        .map(PathBuf::from)
        .unwrap_or_else(|| drive.join("Windows"));
    vec![
        system_root,
        drive.join("Program Files").join("WindowsApps"),
        drive.join("$Recycle.Bin"),
        drive.join("System Volume Information"),
        drive.join("Recovery"),
        drive.join("Boot"),
    ]
}

pub fn platform_protected_exact() -> Vec<PathBuf> {
    let drive = system_drive();
    vec![
        drive.join("Users"),
        drive.join("Users").join("Public"),
        drive.join("Program Files"),
        drive.join("Program Files (x86)"),
        drive.join("ProgramData"),
    ]
}

/// Open log file for appending (no symlink defense available via std on Windows).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Write a new config file atomically using a temp file + rename.
/// Fails if the target already exists.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "config path has no parent"))?;
    fs::create_dir_all(parent)?;

    let tmp = tmp_sibling_name(path);
    let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    f.write_all(contents)?;
    f.sync_all()?;
    drop(f);
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// No-op on Windows; POSIX-style directory modes are not applicable.
pub fn set_dir_mode_0700(_path: &Path) -> io::Result<()> {
    Ok(())
}
