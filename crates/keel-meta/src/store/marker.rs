//! Installation marker and advisory run lock (`keel_meta.installation`).

use super::{format_timestamp, parse_optional_timestamp, parse_timestamp, MarkerStore, MetaStore};
use crate::ddl;
use crate::error::{MetaError, MetaResult, MetaResultExt};
use keel_core::{ActiveRun, InstallationMarker, RunKind, SchemaVersion};

struct MarkerRow {
    installed: bool,
    version: Option<String>,
    installed_at: Option<String>,
    updated_at: Option<String>,
    active_run: Option<String>,
    run_id: Option<String>,
    run_started_at: Option<String>,
}

impl MarkerRow {
    fn decode(self) -> MetaResult<InstallationMarker> {
        let active_run = match self.active_run {
            None => None,
            Some(kind) => {
                let kind = kind
                    .parse::<RunKind>()
                    .map_err(|e| MetaError::CorruptRecord(format!("installation: {e}")))?;
                let started_at = self.run_started_at.ok_or_else(|| {
                    MetaError::CorruptRecord("installation: lock without start time".to_string())
                })?;
                Some(ActiveRun {
                    kind,
                    run_id: self.run_id.unwrap_or_default(),
                    started_at: parse_timestamp("run_started_at", &started_at)?,
                })
            }
        };

        Ok(InstallationMarker {
            installed: self.installed,
            version: self.version,
            installed_at: parse_optional_timestamp("installed_at", self.installed_at)?,
            updated_at: parse_optional_timestamp("updated_at", self.updated_at)?,
            active_run,
        })
    }
}

impl MetaStore<'_> {
    /// Create the marker table and its single row if absent.
    fn ensure_marker_row(&self) -> MetaResult<()> {
        self.ensure(ddl::CREATE_INSTALLATION)?;
        self.db.with_conn(|conn| -> MetaResult<()> {
            conn.execute(
                "INSERT INTO keel_meta.installation (id, installed) VALUES (1, false)
                 ON CONFLICT (id) DO NOTHING",
                [],
            )
            .meta_context("create installation marker")?;
            Ok(())
        })
    }
}

impl MarkerStore for MetaStore<'_> {
    fn get_marker(&self) -> MetaResult<Option<InstallationMarker>> {
        if !self.table_exists(ddl::INSTALLATION_TABLE)? {
            return Ok(None);
        }

        let row = self.db.with_conn(|conn| -> MetaResult<Option<MarkerRow>> {
            match conn.query_row(
                "SELECT installed, version, installed_at, updated_at, active_run, run_id, run_started_at
                 FROM keel_meta.installation WHERE id = 1",
                [],
                |row| {
                    Ok(MarkerRow {
                        installed: row.get(0)?,
                        version: row.get(1)?,
                        installed_at: row.get(2)?,
                        updated_at: row.get(3)?,
                        active_run: row.get(4)?,
                        run_id: row.get(5)?,
                        run_started_at: row.get(6)?,
                    })
                },
            ) {
                Ok(row) => Ok(Some(row)),
                Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(MetaError::QueryError(format!("read installation marker: {e}"))),
            }
        })?;

        row.map(MarkerRow::decode).transpose()
    }

    fn try_acquire_lock(&self, run: &ActiveRun) -> MetaResult<bool> {
        self.ensure_marker_row()?;
        let updated = self.db.with_conn(|conn| -> MetaResult<usize> {
            conn.execute(
                "UPDATE keel_meta.installation
                 SET active_run = ?, run_id = ?, run_started_at = ?
                 WHERE id = 1 AND active_run IS NULL",
                duckdb::params![
                    run.kind.as_str(),
                    run.run_id,
                    format_timestamp(&run.started_at)
                ],
            )
            .meta_context("acquire run lock")
        })?;

        if updated == 1 {
            log::debug!("Acquired {} lock (run {})", run.kind, run.run_id);
        }
        Ok(updated == 1)
    }

    fn release_lock(&self, run_id: &str) -> MetaResult<()> {
        let released = self.db.with_conn(|conn| -> MetaResult<usize> {
            conn.execute(
                "UPDATE keel_meta.installation
                 SET active_run = NULL, run_id = NULL, run_started_at = NULL
                 WHERE id = 1 AND run_id = ?",
                duckdb::params![run_id],
            )
            .meta_context("release run lock")
        })?;

        if released == 0 {
            log::warn!("Run lock for {run_id} was already released");
        }
        Ok(())
    }

    fn force_unlock(&self) -> MetaResult<Option<ActiveRun>> {
        let previous = self.get_marker()?.and_then(|m| m.active_run);
        if previous.is_some() {
            self.db.with_conn(|conn| -> MetaResult<()> {
                conn.execute(
                    "UPDATE keel_meta.installation
                     SET active_run = NULL, run_id = NULL, run_started_at = NULL
                     WHERE id = 1",
                    [],
                )
                .meta_context("clear run lock")?;
                Ok(())
            })?;
        }
        Ok(previous)
    }

    fn record_completion(&self, version: &SchemaVersion) -> MetaResult<()> {
        self.ensure_marker_row()?;
        let mut marker = self
            .get_marker()?
            .unwrap_or_else(InstallationMarker::not_installed);
        marker.mark_completed(version);

        self.db.with_conn(|conn| -> MetaResult<()> {
            conn.execute(
                "UPDATE keel_meta.installation
                 SET installed = ?, version = ?, installed_at = ?, updated_at = ?
                 WHERE id = 1",
                duckdb::params![
                    marker.installed,
                    marker.version,
                    marker.installed_at.as_ref().map(format_timestamp),
                    marker.updated_at.as_ref().map(format_timestamp),
                ],
            )
            .meta_context("update installation marker")?;
            Ok(())
        })?;
        log::debug!("Installation marker updated to {version}");
        Ok(())
    }
}
