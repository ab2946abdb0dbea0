//! Schema version record (`keel_meta.settings`, key `schema_version`).

use super::{format_timestamp, MetaStore, VersionStore};
use crate::ddl;
use crate::error::{MetaError, MetaResult, MetaResultExt};
use chrono::Utc;
use keel_core::SchemaVersion;

const VERSION_KEY: &str = "schema_version";

impl VersionStore for MetaStore<'_> {
    fn get_current_version(&self) -> MetaResult<Option<SchemaVersion>> {
        if !self.table_exists(ddl::SETTINGS_TABLE)? {
            return Ok(None);
        }

        let value = self.db.with_conn(|conn| -> MetaResult<Option<String>> {
            match conn.query_row(
                "SELECT value FROM keel_meta.settings WHERE key = ?",
                duckdb::params![VERSION_KEY],
                |row| row.get::<_, String>(0),
            ) {
                Ok(v) => Ok(Some(v)),
                Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(MetaError::QueryError(format!("read schema version: {e}"))),
            }
        })?;

        value
            .map(|v| {
                SchemaVersion::parse(&v)
                    .map_err(|e| MetaError::CorruptRecord(format!("schema_version: {e}")))
            })
            .transpose()
    }

    fn set_current_version(&self, version: &SchemaVersion) -> MetaResult<()> {
        self.ensure(ddl::CREATE_SETTINGS)?;
        self.db.with_conn(|conn| -> MetaResult<()> {
            conn.execute(
                "INSERT INTO keel_meta.settings (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                duckdb::params![
                    VERSION_KEY,
                    version.to_string(),
                    format_timestamp(&Utc::now())
                ],
            )
            .meta_context("upsert schema version")?;
            Ok(())
        })?;
        log::debug!("Schema version set to {version}");
        Ok(())
    }
}
