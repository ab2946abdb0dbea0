//! keel-db - Database abstraction layer for Keel
//!
//! This crate provides the synchronous `Database` trait the migration
//! executor runs units through, and its DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::Database;
