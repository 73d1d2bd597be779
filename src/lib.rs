//! Core library for `sync_relocate`.
//!
//! Moves a folder's contents into a target (typically inside a cloud-synced
//! tree) and leaves a directory link at the original path, so applications
//! keep using the old location. Every mutation is journaled in an
//! `OperationLog`; a failed run is rolled back in reverse order.
//!
//! Layering: `orchestrator` sequences `validator` -> `engine`; `inspector`
//! reads existing links; all filesystem mutation goes through the
//! `fs_ops::Filesystem` capability trait.

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs_ops;
pub mod inspector;
pub mod model;
pub mod oplog;
pub mod orchestrator;
pub mod output;
pub mod platform;
pub mod shutdown;
pub mod sync_root;
pub mod utils;
pub mod validator;

pub use config::{
    Config, ConfigSource, LogLevel, default_config_path, default_log_path, load_config,
    path_has_symlink_ancestor,
};
pub use engine::{relocate, restore};
pub use errors::{FailureKind, FsError, NotAJunction};
pub use fs_ops::{Filesystem, NativeFs};
pub use inspector::{DEFAULT_SCAN_DEPTH, JunctionScan, inspect_one, list_junctions};
pub use model::{
    Failure, JunctionRecord, LinkStatus, OperationStep, RelocationOptions, RelocationOutcome,
    RelocationRequest, ResidualState, RollbackFailure, ValidationFailure, ValidationResult,
    ValidationWarning,
};
pub use oplog::OperationLog;
pub use orchestrator::{Execution, Orchestrator};
pub use validator::validate;
