//! Migration log (`keel_meta.migrations`).

use super::{format_timestamp, parse_timestamp, MetaStore, MigrationLog};
use crate::ddl;
use crate::error::{MetaError, MetaResult, MetaResultExt};
use keel_core::{LogSnapshot, MigrationRecord, MigrationStatus};

/// Raw row as stored, decoded after the connection lock is released.
struct LogRow {
    filename: String,
    version_tag: String,
    executed_at: String,
    execution_time_ms: i64,
    status: String,
    error_message: Option<String>,
    checksum: Option<String>,
}

impl LogRow {
    fn decode(self) -> MetaResult<MigrationRecord> {
        let status = self
            .status
            .parse::<MigrationStatus>()
            .map_err(|e| MetaError::CorruptRecord(format!("{}: {e}", self.filename)))?;
        let execution_time_ms = u64::try_from(self.execution_time_ms).map_err(|_| {
            MetaError::CorruptRecord(format!(
                "{}: negative execution time {}",
                self.filename, self.execution_time_ms
            ))
        })?;

        Ok(MigrationRecord {
            executed_at: parse_timestamp("executed_at", &self.executed_at)?,
            filename: self.filename,
            version_tag: self.version_tag,
            execution_time_ms,
            status,
            error_message: self.error_message,
            checksum: self.checksum,
        })
    }
}

impl MigrationLog for MetaStore<'_> {
    fn ensure_schema(&self) -> MetaResult<()> {
        self.ensure(ddl::CREATE_MIGRATIONS)
    }

    fn get_all(&self) -> MetaResult<LogSnapshot> {
        if !self.table_exists(ddl::MIGRATIONS_TABLE)? {
            return Ok(LogSnapshot::new());
        }

        let rows = self.db.with_conn(|conn| -> MetaResult<Vec<LogRow>> {
            let mut stmt = conn
                .prepare(
                    "SELECT filename, version_tag, executed_at, execution_time_ms, status, error_message, checksum
                     FROM keel_meta.migrations
                     ORDER BY filename",
                )
                .meta_context("prepare migration log query")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(LogRow {
                        filename: row.get(0)?,
                        version_tag: row.get(1)?,
                        executed_at: row.get(2)?,
                        execution_time_ms: row.get(3)?,
                        status: row.get(4)?,
                        error_message: row.get(5)?,
                        checksum: row.get(6)?,
                    })
                })
                .meta_context("read migration log")?
                .collect::<Result<Vec<_>, _>>()
                .meta_context("read migration log row")?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|row| row.decode().map(|rec| (rec.filename.clone(), rec)))
            .collect()
    }

    fn record_attempt(&self, record: &MigrationRecord) -> MetaResult<()> {
        let execution_time_ms = i64::try_from(record.execution_time_ms).unwrap_or(i64::MAX);
        self.db.with_conn(|conn| -> MetaResult<()> {
            conn.execute(
                "INSERT INTO keel_meta.migrations
                     (filename, version_tag, executed_at, execution_time_ms, status, error_message, checksum)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (filename) DO UPDATE SET
                     version_tag = excluded.version_tag,
                     executed_at = excluded.executed_at,
                     execution_time_ms = excluded.execution_time_ms,
                     status = excluded.status,
                     error_message = excluded.error_message,
                     checksum = excluded.checksum",
                duckdb::params![
                    record.filename,
                    record.version_tag,
                    format_timestamp(&record.executed_at),
                    execution_time_ms,
                    record.status.as_str(),
                    record.error_message,
                    record.checksum,
                ],
            )
            .meta_context(&format!("record attempt for {}", record.filename))?;
            Ok(())
        })?;
        log::debug!("Recorded {} for {}", record.status, record.filename);
        Ok(())
    }
}
