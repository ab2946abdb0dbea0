//! Install/update orchestration behind the installation-state gate.
//!
//! Every entry point recomputes [`InstallState`] from persisted data, rejects
//! the request before touching migration units if the state does not allow
//! it, and holds the advisory run lock in the installation marker for the
//! duration of a run.

use crate::error::{EngineError, EngineResult};
use crate::executor::{MigrationExecutor, RunReport};
use crate::store::{MarkerStore, MigrationLog, VersionStore};
use chrono::Utc;
use keel_core::{
    detect_drift, plan, ActiveRun, Drift, InstallState, InstallationMarker, MigrationCatalog,
    MigrationRecord, MigrationUnit, Operation, RunKind, SchemaVersion,
};
use keel_db::Database;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Snapshot of persisted state for `keel status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: InstallState,
    pub stored_version: Option<String>,
    pub target_version: String,
    pub pending: Vec<String>,
    pub drift: Vec<Drift>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<InstallationMarker>,
}

/// Result of `update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Nothing to do; the schema is already at the target version
    AlreadyCurrent { version: String },
    /// A plan ran (successfully or not)
    Ran(RunReport),
}

/// Migration engine bound to one database, its bookkeeping and a catalog.
pub struct Engine<'a> {
    db: &'a dyn Database,
    log: &'a dyn MigrationLog,
    versions: &'a dyn VersionStore,
    marker: &'a dyn MarkerStore,
    catalog: &'a MigrationCatalog,
}

impl<'a> Engine<'a> {
    pub fn new(
        db: &'a dyn Database,
        log: &'a dyn MigrationLog,
        versions: &'a dyn VersionStore,
        marker: &'a dyn MarkerStore,
        catalog: &'a MigrationCatalog,
    ) -> Self {
        Self {
            db,
            log,
            versions,
            marker,
            catalog,
        }
    }

    /// Current installation state. Read-only.
    pub fn state(&self) -> EngineResult<InstallState> {
        let marker = self.marker.get_marker()?;
        let stored = self.versions.get_current_version()?;
        let pending = self.pending()?.len();
        Ok(InstallState::evaluate(
            marker.as_ref(),
            stored.as_ref(),
            self.catalog.target_version(),
            pending,
        ))
    }

    /// Units a run would execute right now. Read-only.
    pub fn pending(&self) -> EngineResult<Vec<&'a MigrationUnit>> {
        let log = self.log.get_all()?;
        Ok(plan(self.catalog, &log))
    }

    /// Full status snapshot. Read-only.
    pub fn status(&self) -> EngineResult<StatusReport> {
        let marker = self.marker.get_marker()?;
        let stored = self.versions.get_current_version()?;
        let log = self.log.get_all()?;
        let pending = plan(self.catalog, &log);
        let state = InstallState::evaluate(
            marker.as_ref(),
            stored.as_ref(),
            self.catalog.target_version(),
            pending.len(),
        );

        Ok(StatusReport {
            state,
            stored_version: stored.map(|v| v.to_string()),
            target_version: self.catalog.target_version().to_string(),
            pending: pending.iter().map(|u| u.filename().to_string()).collect(),
            drift: detect_drift(self.catalog, &log),
            marker,
        })
    }

    /// Fresh install: run every pending unit. Valid only from `NotInstalled`.
    ///
    /// A previously failed install leaves the state at `NotInstalled`, so
    /// calling this again resumes from the failed unit.
    pub fn install(&self, timeout: Option<Duration>) -> EngineResult<RunReport> {
        let state = self.gate(Operation::Install)?;
        log::debug!("{state} -> {}", InstallState::FreshInstallPending);
        self.run(Operation::Install, timeout)
    }

    /// Apply pending units and advance to the catalog's target version.
    ///
    /// From `InstalledUpToDate` this is a no-op.
    pub fn update(&self, timeout: Option<Duration>) -> EngineResult<UpdateOutcome> {
        let state = self.gate(Operation::Update)?;

        let target = self.catalog.target_version();
        if let Some(stored) = self.versions.get_current_version()? {
            if &stored > target {
                return Err(EngineError::DowngradeRefused {
                    stored: stored.to_string(),
                    target: target.to_string(),
                });
            }
        }

        if state == InstallState::InstalledUpToDate {
            log::info!("Schema already at {target}");
            return Ok(UpdateOutcome::AlreadyCurrent {
                version: target.to_string(),
            });
        }

        self.run(Operation::Update, timeout).map(UpdateOutcome::Ran)
    }

    /// Clear a stale run lock left by a crashed run.
    pub fn unlock(&self) -> EngineResult<Option<ActiveRun>> {
        let previous = self.marker.force_unlock()?;
        if let Some(run) = &previous {
            log::warn!(
                "Cleared {} lock held by run {} since {}",
                run.kind,
                run.run_id,
                run.started_at
            );
        }
        Ok(previous)
    }

    /// Latest recorded attempt per unit, oldest execution first.
    pub fn history(&self) -> EngineResult<Vec<MigrationRecord>> {
        let mut records: Vec<MigrationRecord> = self.log.get_all()?.into_values().collect();
        records.sort_by(|a, b| {
            a.executed_at
                .cmp(&b.executed_at)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(records)
    }

    /// Check the operation against the current state.
    fn gate(&self, operation: Operation) -> EngineResult<InstallState> {
        let state = self.state()?;

        if state.is_running() {
            let run_id = self
                .marker
                .get_marker()?
                .and_then(|m| m.active_run)
                .map(|r| r.run_id);
            return Err(EngineError::ConcurrentRunDetected { state, run_id });
        }

        if !state.allows(operation) {
            return Err(EngineError::InvalidStateTransition { operation, state });
        }
        Ok(state)
    }

    /// Take the lock, plan, execute, and always release the lock.
    fn run(&self, operation: Operation, timeout: Option<Duration>) -> EngineResult<RunReport> {
        self.log.ensure_schema()?;

        let lock = ActiveRun {
            kind: operation.run_kind(),
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        };
        if !self.marker.try_acquire_lock(&lock)? {
            let held = self.marker.get_marker()?.and_then(|m| m.active_run);
            return Err(EngineError::ConcurrentRunDetected {
                state: match held.as_ref().map(|r| r.kind) {
                    Some(RunKind::Updating) => InstallState::Updating,
                    _ => InstallState::Installing,
                },
                run_id: held.map(|r| r.run_id),
            });
        }
        log::info!("Starting {operation} (run {})", lock.run_id);

        let result = self.run_locked(timeout);
        let released = self.marker.release_lock(&lock.run_id);
        if let Err(e) = &released {
            log::error!("Failed to release run lock {}: {e}", lock.run_id);
        }

        let report = result?;
        released?;
        Ok(report)
    }

    fn run_locked(&self, timeout: Option<Duration>) -> EngineResult<RunReport> {
        let log = self.log.get_all()?;
        for drift in detect_drift(self.catalog, &log) {
            match drift {
                Drift::Modified { filename, .. } => {
                    log::warn!("{filename} changed after it was applied; it will not run again")
                }
                Drift::Missing { filename } => {
                    log::warn!("{filename} is recorded in the log but no longer deployed")
                }
            }
        }

        let planned = plan(self.catalog, &log);
        let target: &SchemaVersion = self.catalog.target_version();
        log::info!(
            "{} unit(s) pending, target version {target}",
            planned.len()
        );

        MigrationExecutor::new(self.db, self.log, self.versions, self.marker)
            .with_timeout(timeout)
            .execute(&planned, target)
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
