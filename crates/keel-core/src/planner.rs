//! Migration planner: diff the catalog against the log.
//!
//! Both functions here are pure. Callers fetch the catalog and the log first
//! and pass them in, which keeps planning testable without a database.

use crate::catalog::MigrationCatalog;
use crate::record::MigrationRecord;
use crate::unit::MigrationUnit;
use serde::Serialize;
use std::collections::BTreeMap;

/// Latest log record per unit file name.
pub type LogSnapshot = BTreeMap<String, MigrationRecord>;

/// Units that still need to run, in catalog order.
///
/// A unit is skipped only when its latest record is `success`. Units with no
/// record, or whose last attempt failed, are always planned again.
pub fn plan<'a>(catalog: &'a MigrationCatalog, log: &LogSnapshot) -> Vec<&'a MigrationUnit> {
    catalog
        .list_units()
        .iter()
        .filter(|unit| {
            !log.get(unit.filename())
                .is_some_and(MigrationRecord::is_success)
        })
        .collect()
}

/// Mismatch between what was applied and what is deployed now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Drift {
    /// An applied unit's body changed after it succeeded
    Modified {
        filename: String,
        recorded: String,
        current: String,
    },
    /// The log references a unit that is no longer in the catalog
    Missing { filename: String },
}

impl Drift {
    pub fn filename(&self) -> &str {
        match self {
            Drift::Modified { filename, .. } | Drift::Missing { filename } => filename,
        }
    }
}

/// Detect applied units whose deployed body no longer matches the log.
///
/// Records written without a checksum are never reported as modified.
pub fn detect_drift(catalog: &MigrationCatalog, log: &LogSnapshot) -> Vec<Drift> {
    let mut drift = Vec::new();

    for record in log.values().filter(|r| r.is_success()) {
        match catalog.get(&record.filename) {
            Some(unit) => {
                if let Some(recorded) = &record.checksum {
                    if recorded != unit.checksum() {
                        drift.push(Drift::Modified {
                            filename: record.filename.clone(),
                            recorded: recorded.clone(),
                            current: unit.checksum().to_string(),
                        });
                    }
                }
            }
            None => drift.push(Drift::Missing {
                filename: record.filename.clone(),
            }),
        }
    }

    drift
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod tests;
