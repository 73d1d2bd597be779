//! Settings read from config.xml and overridden by CLI flags.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::DEFAULT_MIN_FREE_SPACE_MB;
use crate::fs_ops::NativeFs;
use crate::inspector::DEFAULT_SCAN_DEPTH;
use crate::model::RelocationOptions;
use crate::sync_root::detect_sync_root;

/// How chatty the console (and log file) should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Info,
    /// Every operation step is logged.
    Debug,
}

// Accepted spellings, first one is canonical.
const SPELLINGS: [(LogLevel, &[&str]); 4] = [
    (LogLevel::Quiet, &["quiet", "error", "none"]),
    (LogLevel::Normal, &["normal"]),
    (LogLevel::Info, &["info", "detailed"]),
    (LogLevel::Debug, &["debug", "trace", "verbose"]),
];

impl LogLevel {
    /// Case-insensitive lookup of any accepted spelling.
    pub fn parse(s: &str) -> Option<Self> {
        SPELLINGS
            .iter()
            .find(|(_, names)| names.iter().any(|n| n.eq_ignore_ascii_case(s)))
            .map(|(lvl, _)| *lvl)
    }

    pub fn as_str(self) -> &'static str {
        SPELLINGS
            .iter()
            .find(|(lvl, _)| *lvl == self)
            .map_or("normal", |(_, names)| names[0])
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("invalid log level: '{s}' (expected quiet, normal, info or debug)")
        })
    }
}

/// Runtime configuration of the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Folders scanned by --list-junctions; empty means the user folders
    pub scan_roots: Vec<PathBuf>,
    pub scan_depth: usize,
    /// Extra folders that must never be relocated
    pub protected_paths: Vec<PathBuf>,
    /// 0 disables the free-space check
    pub min_free_space_mb: u64,
    /// Copy + delete when source and target are on different volumes
    pub copy_across_devices: bool,
    /// Cloud sync folder; None means detect it
    pub sync_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Normal,
            log_file: None,
            scan_roots: Vec::new(),
            scan_depth: DEFAULT_SCAN_DEPTH,
            protected_paths: Vec::new(),
            min_free_space_mb: DEFAULT_MIN_FREE_SPACE_MB,
            copy_across_devices: true,
            sync_root: None,
        }
    }
}

impl Config {
    /// Options for one relocation request.
    pub fn relocation_options(&self, validate_only: bool, verbose: bool) -> RelocationOptions {
        RelocationOptions {
            validate_only,
            verbose,
            min_free_space: self.min_free_space_mb.saturating_mul(1024 * 1024),
            protected_paths: self.protected_paths.clone(),
            sync_root: self.effective_sync_root(),
        }
    }

    /// The configured sync folder, or the detected one.
    pub fn effective_sync_root(&self) -> Option<PathBuf> {
        self.sync_root.clone().or_else(detect_sync_root)
    }

    pub fn filesystem(&self) -> NativeFs {
        NativeFs::new().with_copy_across_devices(self.copy_across_devices)
    }
}
