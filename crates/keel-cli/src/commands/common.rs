//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use keel_core::{Config, MigrationCatalog};
use keel_db::{Database, DuckDbBackend};
use keel_meta::{EngineError, RunReport};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and the database is closed cleanly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Intentionally empty: the command already printed its own message.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Everything a command needs: config, catalog and an open database.
pub(crate) struct Deployment {
    pub(crate) config: Config,
    pub(crate) catalog: MigrationCatalog,
    pub(crate) db: DuckDbBackend,
}

impl Deployment {
    /// Load config and catalog, then open the database.
    ///
    /// The catalog is loaded first so a broken migrations directory never
    /// creates a database file.
    pub(crate) fn open(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);
        let config = load_config(global, &root)?;
        let catalog = load_catalog(&config, &root)?;
        let db = open_database(&database_path(global, &config, &root))?;
        log::debug!(
            "Project '{}': {} migration(s), target {}",
            config.name,
            catalog.len(),
            catalog.target_version()
        );
        Ok(Self {
            config,
            catalog,
            db,
        })
    }

    /// Command-line timeout wins over `timeout_secs` in the config.
    pub(crate) fn timeout(&self, override_secs: Option<u64>) -> Option<Duration> {
        override_secs
            .map(Duration::from_secs)
            .or_else(|| self.config.timeout())
    }
}

/// Load `keel.yml` from `--config` or the project directory.
pub(crate) fn load_config(global: &GlobalArgs, root: &Path) -> Result<Config> {
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(root),
    };
    config
        .map_err(EngineError::from)
        .context("Failed to load config")
}

fn load_catalog(config: &Config, root: &Path) -> Result<MigrationCatalog> {
    let dir = config.migrations_dir(root);
    let target = config.target_version().map_err(EngineError::from)?;
    MigrationCatalog::from_dir(&dir, target)
        .map_err(EngineError::from)
        .with_context(|| format!("Failed to load migrations from {}", dir.display()))
}

fn database_path(global: &GlobalArgs, config: &Config, root: &Path) -> String {
    match &global.database {
        Some(path) => path.clone(),
        None => config.database_path(root),
    }
}

/// Open the DuckDB database, creating its parent directory if needed.
pub(crate) fn open_database(path: &str) -> Result<DuckDbBackend> {
    if path != ":memory:" {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EngineError::StorageUnavailable(format!("{}: {e}", parent.display()))
                })?;
            }
        }
    }

    let db = DuckDbBackend::new(path)
        .map_err(EngineError::from)
        .with_context(|| format!("Failed to open database {path}"))?;
    log::debug!("Opened {} database at {path}", db.db_type());
    Ok(db)
}

/// Process exit code for a command error.
///
/// `2` means the request was refused by the state gate, `3` that storage
/// could not be reached. Everything else, including unit failures, is `1`.
pub(crate) fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(ExitCode(code)) = err.downcast_ref::<ExitCode>() {
        return *code;
    }
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::StorageUnavailable(_)) => 3,
        Some(
            EngineError::InvalidStateTransition { .. }
            | EngineError::ConcurrentRunDetected { .. }
            | EngineError::DowngradeRefused { .. },
        ) => 2,
        _ => 1,
    }
}

/// Print a run report and turn an incomplete run into an error.
pub(crate) fn finish_run(report: RunReport, operation: &str) -> Result<()> {
    for filename in &report.applied {
        println!("  Applied: {filename}");
    }

    if report.timed_out {
        eprintln!(
            "{operation} stopped by timeout; {} migration(s) not started",
            report.not_attempted.len()
        );
        for filename in &report.not_attempted {
            eprintln!("  Not started: {filename}");
        }
        return Err(ExitCode(1).into());
    }

    if report.failed.is_some() {
        for filename in &report.not_attempted {
            eprintln!("  Skipped: {filename}");
        }
        report.into_result()?;
        return Ok(());
    }

    println!(
        "{operation} complete: {} migration(s) applied, schema at {}",
        report.applied.len(),
        report.target_version
    );
    Ok(())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
