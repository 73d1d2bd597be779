//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - Exactly one mode runs per invocation: relocate (--source + --target),
//!   --suggest-target, --list-junctions, --inspect, --remove-junction or --restore.
//! - --verbose is a shorthand for --log-level debug; --silent for quiet.

use clap::{ArgAction, Parser, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};

/// Move a folder to a synced location and leave a directory link behind.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about = "Relocate folders into a synced location behind a directory link"
)]
pub struct Args {
    /// Folder to relocate.
    #[arg(long, short = 's', value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Where the folder's contents should live (must be missing or empty).
    #[arg(long, short = 't', value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub target: Option<PathBuf>,

    /// Only check the request; never touch the filesystem.
    #[arg(long)]
    pub validate_only: bool,

    /// Report every operation step (shorthand for --log-level debug).
    #[arg(long, short = 'v', conflicts_with = "silent")]
    pub verbose: bool,

    /// Only report errors (shorthand for --log-level quiet).
    #[arg(long)]
    pub silent: bool,

    /// List directory links below the scan roots.
    #[arg(long, conflicts_with_all = ["inspect", "remove_junction", "restore"])]
    pub list_junctions: bool,

    /// Folder to scan with --list-junctions (repeatable; default: user folders).
    #[arg(long = "scan-root", value_name = "DIR", action = ArgAction::Append, value_hint = ValueHint::DirPath)]
    pub scan_roots: Vec<PathBuf>,

    /// How deep below each scan root to look.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub scan_depth: Option<u64>,

    /// Show where a single directory link points.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["remove_junction", "restore"])]
    pub inspect: Option<PathBuf>,

    /// Delete a directory link (its target is kept).
    #[arg(long, value_name = "PATH", conflicts_with = "restore")]
    pub remove_junction: Option<PathBuf>,

    /// Undo a relocation: move the contents back and drop the link.
    #[arg(long, value_name = "PATH")]
    pub restore: Option<PathBuf>,

    /// Free space (MiB) the target volume must have; 0 disables the check.
    #[arg(long, value_name = "MB")]
    pub min_free_space_mb: Option<u64>,

    /// Fail instead of copying when source and target are on different volumes.
    #[arg(long)]
    pub no_copy_fallback: bool,

    /// Cloud sync folder targets belong in (default: detect OneDrive).
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub sync_root: Option<PathBuf>,

    /// Print the suggested target for --source (<sync root>/Backup/<name>) and exit.
    #[arg(long, requires = "source", conflicts_with_all = ["target", "list_junctions"])]
    pub suggest_target: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Also write logs to this file.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long)]
    pub json: bool,

    /// Print the config file location used by sync_relocate and exit.
    #[arg(long)]
    pub print_config: bool,
}

/// The operation an invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Relocate {
        source: PathBuf,
        target: PathBuf,
        validate_only: bool,
    },
    SuggestTarget(PathBuf),
    ListJunctions,
    Inspect(PathBuf),
    RemoveJunction(PathBuf),
    Restore(PathBuf),
}

impl Args {
    /// Work out the requested mode; errors carry a user-facing message.
    pub fn mode(&self) -> Result<Mode, String> {
        if self.list_junctions {
            return Ok(Mode::ListJunctions);
        }
        if let Some(p) = &self.inspect {
            return Ok(Mode::Inspect(Self::sanitize_path(p)));
        }
        if let Some(p) = &self.remove_junction {
            return Ok(Mode::RemoveJunction(Self::sanitize_path(p)));
        }
        if let Some(p) = &self.restore {
            return Ok(Mode::Restore(Self::sanitize_path(p)));
        }
        match (&self.source, &self.target) {
            (Some(s), None) if self.suggest_target => {
                Ok(Mode::SuggestTarget(Self::sanitize_path(s)))
            }
            (Some(s), Some(t)) => Ok(Mode::Relocate {
                source: Self::sanitize_path(s),
                target: Self::sanitize_path(t),
                validate_only: self.validate_only,
            }),
            _ => Err("Both --source and --target are required".into()),
        }
    }

    #[inline]
    fn sanitize_path(p: &std::path::Path) -> PathBuf {
        Self::sanitize_str(&p.to_string_lossy())
    }

    #[inline]
    fn sanitize_str(s: &str) -> PathBuf {
        // Trim surrounding single/double quotes left by PowerShell or CMD quoting.
        let trimmed = s.trim();
        let mut inner = if trimmed.len() >= 2
            && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
                || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
        {
            trimmed[1..trimmed.len() - 1].to_string()
        } else {
            trimmed.trim_matches(|c| c == '\'' || c == '"').to_string()
        };

        inner.retain(|c| c != '\'' && c != '"');

        // One trailing separator (e.g. 'C:\Users\me\Documents\'), but never a bare root.
        if (inner.ends_with('\\') || inner.ends_with('/'))
            && inner.len() > 1
            && !inner.ends_with(":\\")
            && !inner.ends_with(":/")
        {
            inner.pop();
        }

        PathBuf::from(inner)
    }

    /// Effective log level derived from flags.
    /// Precedence: --verbose / --silent > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.verbose {
            return Some(LogLevel::Debug);
        }
        if self.silent {
            return Some(LogLevel::Quiet);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(lf) = &self.log_file {
            cfg.log_file = Some(Self::sanitize_path(lf));
        }
        if !self.scan_roots.is_empty() {
            cfg.scan_roots = self.scan_roots.iter().map(|p| Self::sanitize_path(p)).collect();
        }
        if let Some(depth) = self.scan_depth {
            cfg.scan_depth = usize::try_from(depth).unwrap_or(usize::MAX);
        }
        if let Some(mb) = self.min_free_space_mb {
            cfg.min_free_space_mb = mb;
        }
        if self.no_copy_fallback {
            cfg.copy_across_devices = false;
        }
        if let Some(root) = &self.sync_root {
            cfg.sync_root = Some(Self::sanitize_path(root));
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
