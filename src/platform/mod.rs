//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the rest of the codebase can remain platform-agnostic: directory links
//! are symlinks on Unix and NTFS junctions on Windows.

use std::path::PathBuf;

mod temp;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{
    MAX_PATH_LEN, can_list_dir, can_modify_dir, copy_link, create_dir_link, is_dir_link_type,
    open_log_file_secure_append, path_len, platform_protected_exact, platform_protected_trees,
    read_dir_link, remove_dir_link, set_dir_mode_0700, write_config_secure_new_0600,
};

#[cfg(windows)]
pub use windows::{
    MAX_PATH_LEN, can_list_dir, can_modify_dir, copy_link, create_dir_link, is_dir_link_type,
    open_log_file_secure_append, path_len, platform_protected_exact, platform_protected_trees,
    read_dir_link, remove_dir_link, set_dir_mode_0700, write_config_secure_new_0600,
};

/// Directories that must never be relocated, nor anything beneath them.
pub fn protected_trees() -> Vec<PathBuf> {
    platform_protected_trees()
}

/// Directories that must never be relocated themselves (their children may be).
pub fn protected_exact() -> Vec<PathBuf> {
    let mut out = platform_protected_exact();
    if let Some(home) = dirs::home_dir() {
        out.push(home);
    }
    out
}
