//! Bookkeeping stores.
//!
//! Three narrow traits describe what the engine persists. [`MetaStore`]
//! implements all of them on top of the `keel_meta` schema in the same DuckDB
//! database the migrations run against.
//!
//! Reads never create tables: an absent table is reported as "nothing
//! recorded yet". Only writes bootstrap the storage they need.

mod marker;
mod migration_log;
mod version;

use crate::ddl;
use crate::error::{MetaError, MetaResult};
use chrono::{DateTime, Utc};
use keel_core::{ActiveRun, InstallationMarker, LogSnapshot, MigrationRecord, SchemaVersion};
use keel_db::{Database, DuckDbBackend};

/// Persisted current schema version.
pub trait VersionStore {
    /// `None` when nothing has been recorded, including when the table is absent.
    fn get_current_version(&self) -> MetaResult<Option<SchemaVersion>>;

    /// Upsert the version, creating storage if needed.
    fn set_current_version(&self, version: &SchemaVersion) -> MetaResult<()>;
}

/// Ledger of the latest attempt per migration unit.
pub trait MigrationLog {
    /// Create the log table if missing. No preconditions.
    fn ensure_schema(&self) -> MetaResult<()>;

    /// Latest record per filename; empty on a fresh store.
    fn get_all(&self) -> MetaResult<LogSnapshot>;

    /// Insert or overwrite the record for `record.filename`.
    fn record_attempt(&self, record: &MigrationRecord) -> MetaResult<()>;
}

/// Installation marker and advisory run lock.
pub trait MarkerStore {
    fn get_marker(&self) -> MetaResult<Option<InstallationMarker>>;

    /// Take the lock for `run`. Returns `false` if another run holds it.
    fn try_acquire_lock(&self, run: &ActiveRun) -> MetaResult<bool>;

    /// Release the lock if `run_id` still holds it.
    fn release_lock(&self, run_id: &str) -> MetaResult<()>;

    /// Clear the lock regardless of holder, returning the previous holder.
    fn force_unlock(&self) -> MetaResult<Option<ActiveRun>>;

    /// Mark the installation complete at `version`.
    fn record_completion(&self, version: &SchemaVersion) -> MetaResult<()>;
}

/// DuckDB-backed implementation of every bookkeeping store.
pub struct MetaStore<'a> {
    db: &'a DuckDbBackend,
}

impl<'a> MetaStore<'a> {
    pub fn new(db: &'a DuckDbBackend) -> Self {
        Self { db }
    }

    /// Create every bookkeeping table.
    pub fn bootstrap(&self) -> MetaResult<()> {
        self.ensure(ddl::CREATE_SETTINGS)?;
        self.ensure(ddl::CREATE_MIGRATIONS)?;
        self.ensure(ddl::CREATE_INSTALLATION)
    }

    fn ensure(&self, create_table: &str) -> MetaResult<()> {
        self.db
            .execute_batch(&format!("{}\n{create_table}", ddl::CREATE_SCHEMA))
            .map_err(|e| match MetaError::from(e) {
                MetaError::QueryError(msg) => {
                    MetaError::QueryError(format!("failed to create bookkeeping table: {msg}"))
                }
                other => other,
            })
    }

    fn table_exists(&self, table: &str) -> MetaResult<bool> {
        Ok(self.db.relation_exists(table)?)
    }
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> MetaResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| MetaError::CorruptRecord(format!("{field} '{value}': {e}")))
}

pub(crate) fn parse_optional_timestamp(
    field: &str,
    value: Option<String>,
) -> MetaResult<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(field, &v)).transpose()
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
