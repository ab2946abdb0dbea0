//! Shared test utilities for keel-meta

use keel_core::{MigrationCatalog, MigrationUnit, SchemaVersion};
use keel_db::{Database, DbResult, DuckDbBackend};
use std::cell::RefCell;

/// Spy around a real backend that records every statement it executes.
///
/// Transaction control calls are recorded as `BEGIN`, `COMMIT` and
/// `ROLLBACK` so tests can assert transaction boundaries too.
pub struct RecordingDatabase<'a> {
    inner: &'a DuckDbBackend,
    calls: RefCell<Vec<String>>,
}

impl<'a> RecordingDatabase<'a> {
    pub fn new(inner: &'a DuckDbBackend) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Every call in order, including transaction control.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Only the SQL statements, without transaction control.
    pub fn statements(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| !matches!(c.as_str(), "BEGIN" | "COMMIT" | "ROLLBACK"))
            .cloned()
            .collect()
    }

    /// Whether any executed statement contains `needle`.
    pub fn executed(&self, needle: &str) -> bool {
        self.statements().iter().any(|s| s.contains(needle))
    }

    fn push(&self, call: &str) {
        self.calls.borrow_mut().push(call.to_string());
    }
}

impl Database for RecordingDatabase<'_> {
    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.push(sql);
        self.inner.execute_batch(sql)
    }

    fn begin(&self) -> DbResult<()> {
        self.push("BEGIN");
        self.inner.begin()
    }

    fn commit(&self) -> DbResult<()> {
        self.push("COMMIT");
        self.inner.commit()
    }

    fn rollback(&self) -> DbResult<()> {
        self.push("ROLLBACK");
        self.inner.rollback()
    }

    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.inner.relation_exists(name)
    }

    fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.inner.query_count(sql)
    }

    fn db_type(&self) -> &'static str {
        self.inner.db_type()
    }
}

/// Parse a version, panicking on bad input.
pub fn version(s: &str) -> SchemaVersion {
    SchemaVersion::parse(s).unwrap()
}

/// Build a catalog from `(filename, body)` pairs.
pub fn catalog(target: &str, units: &[(&str, &str)]) -> MigrationCatalog {
    MigrationCatalog::from_units(
        version(target),
        units
            .iter()
            .map(|(name, body)| MigrationUnit::new(*name, *body).unwrap()),
    )
    .unwrap()
}

/// Count rows returned by `sql`.
pub fn count(db: &DuckDbBackend, sql: &str) -> usize {
    db.query_count(sql).unwrap()
}
