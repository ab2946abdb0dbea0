//! Embedded DDL for the engine's own bookkeeping tables.
//!
//! Each table is created independently so that any one store can bootstrap
//! its storage without the others existing. Every statement is idempotent.

/// Schema holding all bookkeeping tables.
pub const SCHEMA: &str = "keel_meta";

pub const SETTINGS_TABLE: &str = "keel_meta.settings";
pub const MIGRATIONS_TABLE: &str = "keel_meta.migrations";
pub const INSTALLATION_TABLE: &str = "keel_meta.installation";

pub(crate) const CREATE_SCHEMA: &str = "CREATE SCHEMA IF NOT EXISTS keel_meta;";
pub(crate) const CREATE_SETTINGS: &str = include_str!("settings.sql");
pub(crate) const CREATE_MIGRATIONS: &str = include_str!("migrations.sql");
pub(crate) const CREATE_INSTALLATION: &str = include_str!("installation.sql");
