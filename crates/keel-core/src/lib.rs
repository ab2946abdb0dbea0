//! keel-core - Core library for Keel
//!
//! This crate provides the shared types of the migration engine: schema
//! versions, migration units and their ordering keys, the migration catalog,
//! the pure planner, the SQL statement splitter, bookkeeping records, the
//! installation state machine, and project configuration.

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod error;
pub mod planner;
pub mod record;
pub mod splitter;
pub mod state;
pub mod unit;
pub mod version;

pub use catalog::MigrationCatalog;
pub use checksum::compute_checksum;
pub use config::{Config, DatabaseConfig};
pub use error::{CoreError, CoreResult};
pub use planner::{detect_drift, plan, Drift, LogSnapshot};
pub use record::{ActiveRun, InstallationMarker, MigrationRecord, MigrationStatus, RunKind};
pub use splitter::split_statements;
pub use state::{InstallState, Operation};
pub use unit::{MigrationUnit, OrderKey};
pub use version::SchemaVersion;
