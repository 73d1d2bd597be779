//! Locating the cloud sync folder relocated data should end up in.
//!
//! The OneDrive client exports its folder in `OneDrive`, `OneDriveConsumer`
//! and `OneDriveCommercial`; without those, the usual folder names under the
//! home directory are tried. A configured `sync_root` always wins over
//! detection (see `Config::effective_sync_root`).

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

const SYNC_ROOT_ENV: [&str; 3] = ["OneDrive", "OneDriveConsumer", "OneDriveCommercial"];

const SYNC_ROOT_NAMES: [&str; 4] = [
    "OneDrive",
    "OneDrive - Personal",
    "OneDrive - Business",
    "OneDrive for Business",
];

/// Folder below the sync root that suggested targets are placed in.
pub const BACKUP_DIR: &str = "Backup";

/// The sync folder of the current user, if one exists.
pub fn detect_sync_root() -> Option<PathBuf> {
    detect_from(dirs::home_dir().as_deref(), |key| env::var_os(key))
}

fn detect_from(home: Option<&Path>, var: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    let from_env = SYNC_ROOT_ENV
        .iter()
        .filter_map(|key| var(key))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let from_home = home
        .into_iter()
        .flat_map(|h| SYNC_ROOT_NAMES.iter().map(move |n| h.join(n)));

    let found = from_env.chain(from_home).find(|p| p.is_dir());
    debug!(sync_root = ?found, "sync root detection");
    found
}

/// `<sync_root>/Backup/<source folder name>`, or None for a source without a name.
pub fn suggest_target(source: &Path, sync_root: &Path) -> Option<PathBuf> {
    source
        .file_name()
        .map(|name| sync_root.join(BACKUP_DIR).join(name))
}
