//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a secure template if missing (unless SYNC_RELOCATE_CONFIG is set).
//!
//! Unknown XML fields are a hard error so misconfigurations surface early.
//!
//! <config>
//!   <log_level>normal</log_level>
//!   <log_file>/path/to/sync_relocate.log</log_file>
//!   <scan_root>/home/me/Documents</scan_root>
//!   <scan_root>/home/me/Projects</scan_root>
//!   <scan_depth>2</scan_depth>
//!   <protected_path>/home/me/.ssh</protected_path>
//!   <min_free_space_mb>100</min_free_space_mb>
//!   <copy_across_devices>true</copy_across_devices>
//!   <sync_root>/home/me/OneDrive</sync_root>
//! </config>

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::DEFAULT_MIN_FREE_SPACE_MB;
use super::paths::{CONFIG_ENV, default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use crate::fs_ops::io_error_with_help;
use crate::inspector::DEFAULT_SCAN_DEPTH;
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(rename = "scan_root", default)]
    scan_roots: Vec<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    scan_depth: Option<u64>,
    #[serde(rename = "protected_path", default)]
    protected_paths: Vec<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    min_free_space_mb: Option<u64>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    copy_across_devices: Option<bool>,
    sync_root: Option<String>,
}

// Custom deserializer that trims surrounding whitespace for optional u64
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
    }
}

fn de_bool_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => match s.as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("invalid boolean '{other}'"))),
        },
    }
}

fn non_empty_path(s: &str) -> Option<PathBuf> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

// Map XmlConfig -> Config; missing fields keep their defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(s) = parsed.log_level.as_deref() {
        if !s.trim().is_empty() {
            cfg.log_level = s.trim().parse::<LogLevel>().map_err(|e| anyhow!(e))?;
        }
    }
    cfg.log_file = parsed.log_file.as_deref().and_then(non_empty_path);
    cfg.scan_roots = parsed
        .scan_roots
        .iter()
        .filter_map(|s| non_empty_path(s))
        .collect();
    cfg.protected_paths = parsed
        .protected_paths
        .iter()
        .filter_map(|s| non_empty_path(s))
        .collect();
    if let Some(depth) = parsed.scan_depth {
        if depth == 0 {
            bail!("scan_depth must be at least 1");
        }
        cfg.scan_depth = usize::try_from(depth).unwrap_or(usize::MAX);
    }
    cfg.min_free_space_mb = parsed.min_free_space_mb.unwrap_or(DEFAULT_MIN_FREE_SPACE_MB);
    cfg.copy_across_devices = parsed.copy_across_devices.unwrap_or(true);
    cfg.sync_root = parsed.sync_root.as_deref().and_then(non_empty_path);
    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    let cfg = xml_to_config(parsed)
        .with_context(|| format!("invalid value in config xml '{}'", path.display()))?;
    debug!(path = %path.display(), "loaded config");
    Ok(cfg)
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file.
    File(PathBuf),
    /// No file existed; a template was written here and defaults are in use.
    Template(PathBuf),
    /// Built-in defaults (explicit config path missing, or template creation failed).
    Defaults { reason: String },
}

/// Load the effective configuration.
/// - `$SYNC_RELOCATE_CONFIG` (or the default path) is read when it exists.
/// - A missing explicit file means defaults; a missing default file gets a template.
pub fn load_config() -> Result<(Config, ConfigSource)> {
    let explicit = env::var_os(CONFIG_ENV).is_some();
    let path = default_config_path()?;

    if path.exists() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok((cfg, ConfigSource::File(path)));
    }
    if explicit {
        let reason = format!("{} points to missing file {}", CONFIG_ENV, path.display());
        return Ok((Config::default(), ConfigSource::Defaults { reason }));
    }
    match create_template_config(&path) {
        Ok(()) => Ok((Config::default(), ConfigSource::Template(path))),
        Err(e) => Ok((
            Config::default(),
            ConfigSource::Defaults {
                reason: format!("could not write template {}: {e:#}", path.display()),
            },
        )),
    }
}

/// Create default template config file and parent directory (best-effort permissions).
/// Refuses to write below a symlinked ancestor.
pub fn create_template_config(path: &Path) -> Result<()> {
    if fs::symlink_metadata(path).is_ok() {
        bail!("Refusing to overwrite existing config at {}", path.display());
    }
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error_with_help("create config dir", parent))?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/sync_relocate.log".into());

    let content = format!(
        "<!--\n  sync_relocate configuration (XML)\n\n  Fields (all optional):\n    log_level            -> quiet | normal | info | debug\n    log_file             -> path to a log file (stdout is still used)\n    scan_root            -> folder scanned by list-junctions; repeat for several\n                            (none = Documents, Desktop, Downloads, Pictures, Videos, Music)\n    scan_depth           -> how deep below each scan_root to look (default {depth})\n    protected_path       -> folder that must never be relocated; repeat for several\n    min_free_space_mb    -> free space the target volume must have (0 = no check)\n    copy_across_devices  -> copy + delete when source and target are on different volumes\n    sync_root            -> cloud sync folder targets belong in (none = detect OneDrive)\n\n  CLI flags override XML values.\n-->\n<config>\n  <log_level>normal</log_level>\n  <!-- <log_file>{log}</log_file> -->\n  <scan_depth>{depth}</scan_depth>\n  <min_free_space_mb>{space}</min_free_space_mb>\n  <copy_across_devices>true</copy_across_devices>\n  <!-- <sync_root>/path/to/OneDrive</sync_root> -->\n</config>\n",
        depth = DEFAULT_SCAN_DEPTH,
        log = suggested_log,
        space = DEFAULT_MIN_FREE_SPACE_MB,
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}
