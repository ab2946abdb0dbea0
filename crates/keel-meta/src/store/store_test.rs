//! Tests for the DuckDB bookkeeping stores.

use super::*;
use chrono::Utc;
use keel_core::{MigrationStatus, RunKind};

// ── Helpers ────────────────────────────────────────────────────────────

fn v(s: &str) -> SchemaVersion {
    SchemaVersion::parse(s).unwrap()
}

fn count(db: &DuckDbBackend, sql: &str) -> usize {
    db.query_count(sql).unwrap()
}

fn keel_meta_tables(db: &DuckDbBackend) -> usize {
    count(
        db,
        "SELECT * FROM information_schema.tables WHERE table_schema = 'keel_meta'",
    )
}

fn lock(kind: RunKind, id: &str) -> ActiveRun {
    ActiveRun {
        kind,
        run_id: id.to_string(),
        started_at: Utc::now(),
    }
}

// ── VersionStore ───────────────────────────────────────────────────────

#[test]
fn version_absent_on_fresh_store_without_creating_tables() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    assert_eq!(store.get_current_version().unwrap(), None);
    assert_eq!(keel_meta_tables(&db), 0);
}

#[test]
fn version_set_bootstraps_and_upserts() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);

    store.set_current_version(&v("1.2.0")).unwrap();
    assert_eq!(store.get_current_version().unwrap(), Some(v("1.2.0")));

    store.set_current_version(&v("1.3.0")).unwrap();
    assert_eq!(store.get_current_version().unwrap(), Some(v("1.3.0")));
    assert_eq!(count(&db, "SELECT * FROM keel_meta.settings"), 1);
}

#[test]
fn version_corrupt_value_is_reported() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store.set_current_version(&v("1.0.0")).unwrap();
    db.execute_batch("UPDATE keel_meta.settings SET value = 'garbage'")
        .unwrap();

    let err = store.get_current_version().unwrap_err();
    assert!(matches!(err, MetaError::CorruptRecord(_)));
}

// ── MigrationLog ───────────────────────────────────────────────────────

#[test]
fn log_empty_when_table_absent() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    assert!(store.get_all().unwrap().is_empty());
    assert_eq!(keel_meta_tables(&db), 0);
}

#[test]
fn log_ensure_schema_is_idempotent_and_standalone() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store.ensure_schema().unwrap();
    store.ensure_schema().unwrap();

    assert!(db.relation_exists(ddl::MIGRATIONS_TABLE).unwrap());
    assert!(!db.relation_exists(ddl::SETTINGS_TABLE).unwrap());
    assert!(!db.relation_exists(ddl::INSTALLATION_TABLE).unwrap());
    assert!(store.get_all().unwrap().is_empty());
}

#[test]
fn log_record_attempt_upserts_by_filename() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store.ensure_schema().unwrap();

    store
        .record_attempt(&MigrationRecord::failed(
            "002_b.sql",
            &v("1.0.0"),
            7,
            "syntax error",
            Some("abc".into()),
        ))
        .unwrap();
    store
        .record_attempt(&MigrationRecord::success(
            "002_b.sql",
            &v("1.0.1"),
            9,
            Some("def".into()),
        ))
        .unwrap();

    let all = store.get_all().unwrap();
    assert_eq!(all.len(), 1);
    let rec = &all["002_b.sql"];
    assert_eq!(rec.status, MigrationStatus::Success);
    assert_eq!(rec.version_tag, "1.0.1");
    assert_eq!(rec.execution_time_ms, 9);
    assert_eq!(rec.error_message, None);
    assert_eq!(rec.checksum.as_deref(), Some("def"));
}

#[test]
fn log_round_trips_timestamps() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store.ensure_schema().unwrap();

    let rec = MigrationRecord::success("001_a.sql", &v("1.0.0"), 1, None);
    store.record_attempt(&rec).unwrap();

    let stored = &store.get_all().unwrap()["001_a.sql"];
    assert_eq!(stored.executed_at, rec.executed_at);
}

#[test]
fn log_rejects_unknown_status() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store.ensure_schema().unwrap();
    assert!(db
        .execute_batch(
            "INSERT INTO keel_meta.migrations (filename, version_tag, executed_at, execution_time_ms, status)
             VALUES ('x.sql', '1.0.0', '2024-01-01T00:00:00+00:00', 1, 'abandoned')",
        )
        .is_err());
}

#[test]
fn log_malformed_table_is_an_error_not_empty() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE SCHEMA keel_meta; CREATE TABLE keel_meta.migrations (oops INTEGER);")
        .unwrap();
    let store = MetaStore::new(&db);
    let err = store.get_all().unwrap_err();
    assert!(matches!(err, MetaError::QueryError(_)));
}

// ── MarkerStore ────────────────────────────────────────────────────────

#[test]
fn marker_absent_on_fresh_store() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    assert_eq!(store.get_marker().unwrap(), None);
    assert_eq!(keel_meta_tables(&db), 0);
}

#[test]
fn marker_lock_is_exclusive() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);

    assert!(store
        .try_acquire_lock(&lock(RunKind::Installing, "run-1"))
        .unwrap());
    assert!(!store
        .try_acquire_lock(&lock(RunKind::Installing, "run-2"))
        .unwrap());

    let marker = store.get_marker().unwrap().unwrap();
    assert!(!marker.installed);
    let active = marker.active_run.unwrap();
    assert_eq!(active.kind, RunKind::Installing);
    assert_eq!(active.run_id, "run-1");

    // Only the holder releases.
    store.release_lock("run-2").unwrap();
    assert!(store.get_marker().unwrap().unwrap().active_run.is_some());
    store.release_lock("run-1").unwrap();
    assert!(store.get_marker().unwrap().unwrap().active_run.is_none());

    assert!(store
        .try_acquire_lock(&lock(RunKind::Updating, "run-3"))
        .unwrap());
}

#[test]
fn marker_force_unlock_returns_previous_holder() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    assert_eq!(store.force_unlock().unwrap(), None);

    store
        .try_acquire_lock(&lock(RunKind::Updating, "stale"))
        .unwrap();
    let previous = store.force_unlock().unwrap().unwrap();
    assert_eq!(previous.run_id, "stale");
    assert!(store.get_marker().unwrap().unwrap().active_run.is_none());
}

#[test]
fn marker_record_completion_keeps_first_install_time() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);

    store.record_completion(&v("1.0.0")).unwrap();
    let first = store.get_marker().unwrap().unwrap();
    assert!(first.installed);
    assert_eq!(first.version.as_deref(), Some("1.0.0"));
    assert!(first.installed_at.is_some());

    store.record_completion(&v("1.1.0")).unwrap();
    let second = store.get_marker().unwrap().unwrap();
    assert_eq!(second.version.as_deref(), Some("1.1.0"));
    assert_eq!(second.installed_at, first.installed_at);
    assert!(second.updated_at >= first.updated_at);
}

#[test]
fn marker_completion_does_not_touch_lock() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store
        .try_acquire_lock(&lock(RunKind::Installing, "run-1"))
        .unwrap();
    store.record_completion(&v("1.0.0")).unwrap();
    assert_eq!(
        store
            .get_marker()
            .unwrap()
            .unwrap()
            .active_run
            .unwrap()
            .run_id,
        "run-1"
    );
}

#[test]
fn bootstrap_creates_every_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store.bootstrap().unwrap();
    store.bootstrap().unwrap();
    assert_eq!(keel_meta_tables(&db), 3);
}
