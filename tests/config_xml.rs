use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

use sync_relocate::config::{CONFIG_ENV, load_config_from_xml_path};
use sync_relocate::{Config, ConfigSource, LogLevel, default_config_path, load_config};

struct EnvGuard;

impl EnvGuard {
    fn set(value: &std::path::Path) -> Self {
        unsafe {
            std::env::set_var(CONFIG_ENV, value);
        }
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            std::env::remove_var(CONFIG_ENV);
        }
    }
}

#[test]
#[serial]
fn env_file_is_loaded() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("custom.xml");
    fs::write(
        &cfg_path,
        r#"<config>
  <log_level>debug</log_level>
  <log_file>  </log_file>
  <scan_root>/data/one</scan_root>
  <protected_path>/data/keep</protected_path>
  <min_free_space_mb>5</min_free_space_mb>
</config>"#,
    )
    .unwrap();
    let _env = EnvGuard::set(&cfg_path);

    let (cfg, source) = load_config().unwrap();
    assert_eq!(source, ConfigSource::File(cfg_path.clone()));
    assert_eq!(cfg.log_level, LogLevel::Debug);
    assert_eq!(cfg.log_file, None);
    assert_eq!(cfg.scan_roots, vec![PathBuf::from("/data/one")]);
    assert_eq!(cfg.protected_paths, vec![PathBuf::from("/data/keep")]);
    assert_eq!(cfg.min_free_space_mb, 5);
    assert!(cfg.copy_across_devices);
}

#[test]
#[serial]
fn env_directory_means_config_xml_inside() {
    let td = tempdir().unwrap();
    let _env = EnvGuard::set(td.path());
    assert_eq!(default_config_path().unwrap(), td.path().join("config.xml"));
}

#[test]
#[serial]
fn missing_env_file_falls_back_to_defaults_without_a_template() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("nope.xml");
    let _env = EnvGuard::set(&cfg_path);

    let (cfg, source) = load_config().unwrap();
    assert_eq!(cfg, Config::default());
    assert!(matches!(source, ConfigSource::Defaults { .. }));
    assert!(!cfg_path.exists());
}

#[test]
fn malformed_xml_is_an_error() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("config.xml");
    fs::write(&cfg_path, "<config><log_level>normal</config>").unwrap();
    assert!(load_config_from_xml_path(&cfg_path).is_err());
}

#[test]
fn invalid_values_are_errors() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("config.xml");

    fs::write(&cfg_path, "<config><log_level>loud</log_level></config>").unwrap();
    let err = load_config_from_xml_path(&cfg_path).unwrap_err();
    assert!(format!("{err:#}").contains("invalid log level"));

    fs::write(&cfg_path, "<config><scan_depth>0</scan_depth></config>").unwrap();
    assert!(load_config_from_xml_path(&cfg_path).is_err());

    fs::write(
        &cfg_path,
        "<config><copy_across_devices>maybe</copy_across_devices></config>",
    )
    .unwrap();
    assert!(load_config_from_xml_path(&cfg_path).is_err());
}

#[test]
fn empty_config_means_defaults() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("config.xml");
    fs::write(&cfg_path, "<config></config>").unwrap();
    assert_eq!(load_config_from_xml_path(&cfg_path).unwrap(), Config::default());
}

#[cfg(unix)]
#[test]
fn template_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let td = tempdir().unwrap();
    let root = fs::canonicalize(td.path()).unwrap();
    let cfg_path = root.join("sync_relocate").join("config.xml");
    sync_relocate::config::create_template_config(&cfg_path).unwrap();
    let mode = fs::metadata(&cfg_path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    // Never overwrite an existing file.
    assert!(sync_relocate::config::create_template_config(&cfg_path).is_err());
}
