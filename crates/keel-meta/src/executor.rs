//! Migration executor: apply a plan one unit per transaction, fail fast.
//!
//! For each unit the body is split into statements and run inside a single
//! `BEGIN` / `COMMIT`. Any statement error rolls the unit back, records it as
//! `failed` and stops the run; units already committed stay committed. The
//! log entry for a unit is written only after its transaction outcome is
//! known. The version record and installation marker advance only when the
//! whole plan succeeded.

use crate::error::{EngineError, EngineResult};
use crate::store::{MarkerStore, MigrationLog, VersionStore};
use keel_core::{split_statements, MigrationRecord, MigrationUnit, SchemaVersion};
use keel_db::Database;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Outcome of one executor run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Version the run was targeting
    pub target_version: String,

    /// Units committed by this run, in order
    pub applied: Vec<String>,

    /// Unit that failed and stopped the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,

    /// Database error for the failed unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Planned units never attempted (after a failure or timeout)
    pub not_attempted: Vec<String>,

    /// The deadline passed before every unit could start
    pub timed_out: bool,
}

impl RunReport {
    fn new(target: &SchemaVersion) -> Self {
        Self {
            target_version: target.to_string(),
            applied: Vec::new(),
            failed: None,
            error: None,
            not_attempted: Vec::new(),
            timed_out: false,
        }
    }

    /// Every planned unit committed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_none() && !self.timed_out
    }

    /// Convert a unit failure into [`EngineError::UnitExecutionFailed`].
    pub fn into_result(self) -> EngineResult<Self> {
        match (&self.failed, &self.error) {
            (Some(filename), cause) => Err(EngineError::UnitExecutionFailed {
                filename: filename.clone(),
                cause: cause.clone().unwrap_or_default(),
            }),
            (None, _) => Ok(self),
        }
    }
}

/// Applies planned units through an injected connection and stores.
pub struct MigrationExecutor<'a> {
    db: &'a dyn Database,
    log: &'a dyn MigrationLog,
    versions: &'a dyn VersionStore,
    marker: &'a dyn MarkerStore,
    timeout: Option<Duration>,
}

impl<'a> MigrationExecutor<'a> {
    pub fn new(
        db: &'a dyn Database,
        log: &'a dyn MigrationLog,
        versions: &'a dyn VersionStore,
        marker: &'a dyn MarkerStore,
    ) -> Self {
        Self {
            db,
            log,
            versions,
            marker,
            timeout: None,
        }
    }

    /// Stop starting new units once `timeout` has elapsed.
    ///
    /// A unit already inside its transaction always runs to commit or
    /// rollback.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `plan` in order, targeting `target`.
    ///
    /// Unit failures are reported in the returned [`RunReport`]; only
    /// bookkeeping failures are returned as errors.
    pub fn execute(
        &self,
        plan: &[&MigrationUnit],
        target: &SchemaVersion,
    ) -> EngineResult<RunReport> {
        // A timeout too large to represent means no deadline.
        let deadline = self.timeout.and_then(|t| Instant::now().checked_add(t));
        let mut report = RunReport::new(target);

        for (idx, unit) in plan.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                log::warn!(
                    "Timeout reached; not starting {} and {} later unit(s)",
                    unit.filename(),
                    plan.len() - idx - 1
                );
                report.timed_out = true;
                report.not_attempted = remaining(&plan[idx..]);
                break;
            }

            log::info!("Applying {}", unit.filename());
            let started = Instant::now();
            let outcome = self.apply_unit(unit);
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            let checksum = Some(unit.checksum().to_string());

            match outcome {
                Ok(()) => {
                    self.log.record_attempt(&MigrationRecord::success(
                        unit.filename(),
                        target,
                        elapsed_ms,
                        checksum,
                    ))?;
                    log::info!("Applied {} ({elapsed_ms} ms)", unit.filename());
                    report.applied.push(unit.filename().to_string());
                }
                Err(cause) => {
                    self.log.record_attempt(&MigrationRecord::failed(
                        unit.filename(),
                        target,
                        elapsed_ms,
                        cause.clone(),
                        checksum,
                    ))?;
                    log::error!("Migration {} failed: {cause}", unit.filename());
                    report.failed = Some(unit.filename().to_string());
                    report.error = Some(cause);
                    report.not_attempted = remaining(&plan[idx + 1..]);
                    break;
                }
            }
        }

        if report.is_complete() {
            self.finish(target)?;
        }
        Ok(report)
    }

    /// Run one unit inside its own transaction.
    ///
    /// Returns the database error text on failure, after rolling back.
    fn apply_unit(&self, unit: &MigrationUnit) -> Result<(), String> {
        let statements = split_statements(unit.body());
        log::debug!(
            "{}: {} statement(s)",
            unit.filename(),
            statements.len()
        );

        self.db
            .begin()
            .map_err(|e| format!("could not open transaction: {e}"))?;

        for (n, statement) in statements.iter().enumerate() {
            if let Err(e) = self.db.execute_batch(statement) {
                self.rollback(unit);
                return Err(format!("statement {}: {e}", n + 1));
            }
        }

        if let Err(e) = self.db.commit() {
            self.rollback(unit);
            return Err(e.to_string());
        }
        Ok(())
    }

    fn rollback(&self, unit: &MigrationUnit) {
        if let Err(e) = self.db.rollback() {
            log::warn!("Rollback of {} failed: {e}", unit.filename());
        }
    }

    /// Advance the version record and installation marker.
    ///
    /// The version only moves forward; a target equal to or older than the
    /// stored version leaves the record as is. The marker always records the
    /// version the store ends up holding.
    fn finish(&self, target: &SchemaVersion) -> EngineResult<()> {
        let current = self.versions.get_current_version()?;
        let settled = match current {
            Some(current) if current >= *target => current,
            current => {
                self.versions.set_current_version(target)?;
                log::info!(
                    "Schema version {} -> {target}",
                    current.map_or_else(|| "none".to_string(), |c| c.to_string())
                );
                target.clone()
            }
        };
        self.marker.record_completion(&settled)?;
        Ok(())
    }
}

fn remaining(units: &[&MigrationUnit]) -> Vec<String> {
    units.iter().map(|u| u.filename().to_string()).collect()
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
