//! Orchestrator: the single entry point for the presentation layer.
//! Sequences validator -> engine per request, and exposes listing,
//! inspection, link removal and restore.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine;
use crate::errors::{FsError, NotAJunction};
use crate::fs_ops::{Filesystem, NativeFs};
use crate::inspector::{self, JunctionScan};
use crate::model::{
    JunctionRecord, RelocationOptions, RelocationOutcome, RelocationRequest, ValidationResult,
};
use crate::oplog::OperationLog;
use crate::utils::{normalize_path, same_location};
use crate::validator::validate;

/// What `execute` produced: a validation verdict (validate-only or rejected
/// request) or the outcome of an engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Validated(ValidationResult),
    Relocated(RelocationOutcome),
}

#[derive(Debug, Default)]
pub struct Orchestrator<F: Filesystem = NativeFs> {
    fs: F,
}

impl<F: Filesystem> Orchestrator<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Validate and, unless `validate_only` is set or validation fails,
    /// relocate `source` into `target`.
    pub fn execute(
        &self,
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
        options: RelocationOptions,
    ) -> Result<Execution> {
        let request = RelocationRequest::new(source, target, options)?;

        if request.options.validate_only {
            return Ok(Execution::Validated(validate(&request)));
        }

        // A finished relocation would fail validation as AlreadyLinked; the
        // engine confirms it without touching anything instead.
        let already_done = inspector::inspect_one(&request.source)
            .map(|rec| rec.is_valid && same_location(&rec.real_target, &request.target))
            .unwrap_or(false);
        if !already_done {
            let validation = validate(&request);
            if !validation.is_ok() {
                return Ok(Execution::Validated(validation));
            }
        }

        let mut log = OperationLog::new();
        let outcome = engine::relocate(&self.fs, &request, &mut log);
        if request.options.verbose {
            for step in log.steps_so_far() {
                info!(step = %step, "operation step");
            }
        }
        log.clear();
        Ok(Execution::Relocated(outcome))
    }

    /// Scan `roots` (the default user folders when empty) for directory links.
    pub fn list_junctions(&self, roots: Vec<PathBuf>, max_depth: usize) -> JunctionScan {
        let roots = if roots.is_empty() {
            inspector::default_scan_roots()
        } else {
            roots
                .into_iter()
                .map(|r| normalize_path(&r).unwrap_or(r))
                .collect()
        };
        inspector::list_junctions(roots, max_depth)
    }

    pub fn inspect(&self, path: impl AsRef<Path>) -> Result<JunctionRecord, NotAJunction> {
        let path = path.as_ref();
        let path = normalize_path(path).map_err(|_| NotAJunction {
            path: path.to_path_buf(),
        })?;
        inspector::inspect_one(&path)
    }

    /// Delete the directory link at `path`; its target is left untouched.
    /// Returns the link as it was just before removal.
    pub fn remove_junction(&self, path: impl AsRef<Path>) -> Result<JunctionRecord, FsError> {
        let path = path.as_ref();
        let path = normalize_path(path).map_err(|_| FsError::NotFound {
            path: path.to_path_buf(),
        })?;
        let record = inspector::inspect_one(&path).map_err(|e| FsError::NotALink { path: e.path })?;
        self.fs.remove_dir_link(&path)?;
        info!(link = %path.display(), target = %record.real_target.display(), "directory link removed");
        Ok(record)
    }

    /// Undo a relocation: bring the contents back to `link`.
    pub fn restore(&self, link: impl AsRef<Path>) -> Result<RelocationOutcome> {
        let link = link.as_ref();
        let link = normalize_path(link)
            .with_context(|| format!("invalid link path '{}'", link.display()))?;
        let mut log = OperationLog::new();
        let outcome = engine::restore(&self.fs, &link, &mut log);
        log.clear();
        Ok(outcome)
    }
}
