//! Config module.
//! Provides configuration types, default paths and XML loading.
//! The core never reads the file itself: the binary turns a `Config` into
//! plain `RelocationOptions`, scan roots and a `NativeFs`.

pub mod paths;
pub mod types;
pub mod xml;

pub use paths::{CONFIG_ENV, default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{ConfigSource, create_template_config, load_config, load_config_from_xml_path};

/// Free space (MiB) the target volume must keep, unless configured otherwise.
pub const DEFAULT_MIN_FREE_SPACE_MB: u64 = 100;
