//! Bookkeeping store and migration engine for Keel.
//!
//! Persists the schema version, the migration log and the installation
//! marker in the `keel_meta` schema of the target DuckDB database, and runs
//! planned migration units against it one transaction per unit.

pub mod ddl;
pub mod engine;
pub mod error;
pub mod executor;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use engine::{Engine, StatusReport, UpdateOutcome};
pub use error::{EngineError, EngineResult, MetaError, MetaResult};
pub use executor::{MigrationExecutor, RunReport};
pub use store::{MarkerStore, MetaStore, MigrationLog, VersionStore};
