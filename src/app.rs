//! Application driver.
//! Loads/merges config, initializes logging, installs the interrupt handler,
//! then dispatches the requested mode through the Orchestrator and prints
//! the full result.
//!
//! Exit status: 0 on success, 2 when validation rejects a request or a path
//! is not a link, the failure kind's code for a failed relocation/restore,
//! 1 for any other error.

use anyhow::{Result, bail};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use sync_relocate::cli::{Args, Mode};
use sync_relocate::output as out;
use sync_relocate::config::CONFIG_ENV;
use sync_relocate::sync_root::suggest_target;
use sync_relocate::utils::normalize_path;
use sync_relocate::{
    ConfigSource, Execution, LogLevel, Orchestrator, RelocationOutcome, default_config_path,
    load_config, shutdown,
};

use crate::logging::init_tracing;

const EXIT_REJECTED: i32 = 2;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        if let Ok(cfg_env) = std::env::var(CONFIG_ENV) {
            out::print_info(&format!("Using {CONFIG_ENV} (explicit): {cfg_env}"));
        }
        let path = default_config_path()?;
        out::print_user(&path.display().to_string());
        if !path.exists() {
            out::print_info("No config file exists there yet; one is created on the next run.");
        }
        return Ok(());
    }

    let mode = match args.mode() {
        Ok(m) => m,
        Err(msg) => bail!(msg),
    };

    let (mut cfg, source) = load_config()?;
    match &source {
        ConfigSource::File(_) => {}
        ConfigSource::Template(path) => {
            out::print_info(&format!(
                "A template sync_relocate config was written to: {} (defaults in use)",
                path.display()
            ));
        }
        ConfigSource::Defaults { reason } => {
            out::print_warn(&format!("Using built-in defaults: {reason}"));
        }
    }
    args.apply_overrides(&mut cfg);

    let guard_opt = init_tracing(cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        let installed = ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; stopping after the current entry and rolling back...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        });
        if let Err(e) = installed {
            warn!(error = %e, "could not install interrupt handler");
        }
    }

    debug!(?source, ?mode, "starting sync_relocate");

    let orchestrator = Orchestrator::new(cfg.filesystem());
    let verbose = args.verbose || cfg.log_level == LogLevel::Debug;

    let result = (|| -> Result<i32> {
        match mode {
            Mode::Relocate {
                source,
                target,
                validate_only,
            } => {
                let options = cfg.relocation_options(validate_only, verbose);
                match orchestrator.execute(&source, &target, options)? {
                    Execution::Validated(result) => {
                        out::print_validation(&result);
                        if result.is_ok() {
                            Ok(0)
                        } else {
                            error!(
                                source = %source.display(),
                                target = %target.display(),
                                failures = result.failures().len(),
                                "request rejected"
                            );
                            Ok(EXIT_REJECTED)
                        }
                    }
                    Execution::Relocated(outcome) => Ok(report_outcome(&outcome)),
                }
            }
            Mode::SuggestTarget(source) => {
                let source = normalize_path(&source)?;
                let Some(root) = cfg.effective_sync_root() else {
                    out::print_error(
                        "No sync folder found; set <sync_root> in the config or pass --sync-root",
                    );
                    return Ok(EXIT_REJECTED);
                };
                match suggest_target(&source, &root) {
                    Some(target) => {
                        out::print_user(&target.display().to_string());
                        Ok(0)
                    }
                    None => {
                        out::print_error(&format!("{} has no folder name", source.display()));
                        Ok(EXIT_REJECTED)
                    }
                }
            }
            Mode::ListJunctions => {
                let mut found = 0usize;
                for record in orchestrator.list_junctions(cfg.scan_roots.clone(), cfg.scan_depth) {
                    out::print_user(&out::junction_line(&record));
                    found += 1;
                }
                out::print_info(&format!("{found} directory link(s) found"));
                Ok(0)
            }
            Mode::Inspect(path) => match orchestrator.inspect(&path) {
                Ok(record) => {
                    out::print_user(&out::junction_line(&record));
                    Ok(0)
                }
                Err(e) => {
                    out::print_error(&e.to_string());
                    Ok(EXIT_REJECTED)
                }
            },
            Mode::RemoveJunction(path) => match orchestrator.remove_junction(&path) {
                Ok(record) => {
                    out::print_success(&format!(
                        "removed link {} (target {} kept)",
                        record.link_path.display(),
                        record.real_target.display()
                    ));
                    Ok(0)
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "link removal failed");
                    out::print_error(&e.to_string());
                    Ok(EXIT_REJECTED)
                }
            },
            Mode::Restore(path) => {
                let outcome = orchestrator.restore(&path)?;
                Ok(report_outcome(&outcome))
            }
        }
    })();

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    match result? {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}

fn report_outcome(outcome: &RelocationOutcome) -> i32 {
    out::print_outcome(outcome);
    match outcome.failure() {
        None => {
            info!("relocation complete");
            0
        }
        Some(reason) => reason.kind.code(),
    }
}
