//! Tests for the migration executor.

use super::*;
use crate::store::MetaStore;
use crate::test_utils::{catalog, count, version, RecordingDatabase};
use keel_core::{plan, MigrationStatus};
use keel_db::DuckDbBackend;

const A: (&str, &str) = ("001_a.sql", "CREATE TABLE a (id INTEGER);");
const B_BROKEN: (&str, &str) = (
    "002_b.sql",
    "CREATE TABLE b (id INTEGER); INSERT INTO no_such_table VALUES (1);",
);
const B_FIXED: (&str, &str) = (
    "002_b.sql",
    "CREATE TABLE b (id INTEGER); INSERT INTO b VALUES (1);",
);
const C: (&str, &str) = ("003_c.sql", "CREATE TABLE c (id INTEGER);");

fn run(
    db: &DuckDbBackend,
    spy: &RecordingDatabase<'_>,
    units: &[(&str, &str)],
    target: &str,
) -> RunReport {
    let store = MetaStore::new(db);
    store.bootstrap().unwrap();
    let cat = catalog(target, units);
    let log = store.get_all().unwrap();
    let planned = plan(&cat, &log);
    MigrationExecutor::new(spy, &store, &store, &store)
        .execute(&planned, cat.target_version())
        .unwrap()
}

#[test]
fn test_applies_each_unit_in_its_own_transaction() {
    let db = DuckDbBackend::in_memory().unwrap();
    let spy = RecordingDatabase::new(&db);
    let report = run(&db, &spy, &[A, C], "1.0.0");

    assert!(report.is_complete());
    assert_eq!(report.applied, vec!["001_a.sql", "003_c.sql"]);
    assert_eq!(
        spy.calls(),
        vec![
            "BEGIN",
            "CREATE TABLE a (id INTEGER)",
            "COMMIT",
            "BEGIN",
            "CREATE TABLE c (id INTEGER)",
            "COMMIT",
        ]
    );

    let store = MetaStore::new(&db);
    assert_eq!(store.get_current_version().unwrap(), Some(version("1.0.0")));
    assert!(store.get_marker().unwrap().unwrap().installed);
}

#[test]
fn test_fail_fast_keeps_prior_units_and_skips_later_ones() {
    let db = DuckDbBackend::in_memory().unwrap();
    let spy = RecordingDatabase::new(&db);
    let report = run(&db, &spy, &[A, B_BROKEN, C], "1.0.0");

    assert_eq!(report.applied, vec!["001_a.sql"]);
    assert_eq!(report.failed.as_deref(), Some("002_b.sql"));
    assert!(report.error.as_deref().unwrap().contains("statement 2"));
    assert_eq!(report.not_attempted, vec!["003_c.sql"]);
    assert!(!spy.executed("CREATE TABLE c"));

    // A committed, B rolled back entirely (including its first statement).
    assert!(db.relation_exists("a").unwrap());
    assert!(!db.relation_exists("b").unwrap());
    assert!(!db.relation_exists("c").unwrap());

    let store = MetaStore::new(&db);
    let log = store.get_all().unwrap();
    assert_eq!(log["001_a.sql"].status, MigrationStatus::Success);
    assert_eq!(log["002_b.sql"].status, MigrationStatus::Failed);
    assert!(log["002_b.sql"].error_message.is_some());
    assert!(!log.contains_key("003_c.sql"));

    // No version bump or install marker after a failed run.
    assert_eq!(store.get_current_version().unwrap(), None);
    assert!(store.get_marker().unwrap().map_or(true, |m| !m.installed));
}

#[test]
fn test_retry_after_fix_resumes_from_failure() {
    let db = DuckDbBackend::in_memory().unwrap();
    let first = RecordingDatabase::new(&db);
    run(&db, &first, &[A, B_BROKEN, C], "1.0.0");

    let second = RecordingDatabase::new(&db);
    let report = run(&db, &second, &[A, B_FIXED, C], "1.0.0");

    assert!(report.is_complete());
    assert_eq!(report.applied, vec!["002_b.sql", "003_c.sql"]);
    assert!(!second.executed("CREATE TABLE a"));
    assert!(second.executed("CREATE TABLE b"));
    assert!(second.executed("CREATE TABLE c"));

    let log = MetaStore::new(&db).get_all().unwrap();
    assert!(log.values().all(|r| r.status == MigrationStatus::Success));
    assert_eq!(count(&db, "SELECT * FROM b"), 1);
}

#[test]
fn test_rerun_never_reexecutes_successful_units() {
    let db = DuckDbBackend::in_memory().unwrap();
    let first = RecordingDatabase::new(&db);
    run(&db, &first, &[A], "1.0.0");

    let second = RecordingDatabase::new(&db);
    let report = run(&db, &second, &[A], "1.0.0");
    assert!(report.applied.is_empty());
    assert!(second.calls().is_empty());
}

#[test]
fn test_quoted_semicolons_run_as_one_statement() {
    let db = DuckDbBackend::in_memory().unwrap();
    let spy = RecordingDatabase::new(&db);
    let unit = (
        "001_seed.sql",
        "CREATE TABLE t (s VARCHAR); INSERT INTO t (s) VALUES ('a;b');",
    );
    let report = run(&db, &spy, &[unit], "1.0.0");

    assert!(report.is_complete());
    assert_eq!(spy.statements().len(), 2);
    let stored: String = db
        .with_conn(|conn| -> keel_db::DbResult<String> {
            Ok(conn.query_row("SELECT s FROM t", [], |row| row.get(0))?)
        })
        .unwrap();
    assert_eq!(stored, "a;b");
}

#[test]
fn test_dollar_escape_and_nested_comment_forms_run_intact() {
    let db = DuckDbBackend::in_memory().unwrap();
    let spy = RecordingDatabase::new(&db);
    let unit = (
        "001_seed.sql",
        r"CREATE TABLE t (s VARCHAR);
          INSERT INTO t VALUES ($$a;b$$);
          /* outer /* inner */ ; */
          INSERT INTO t VALUES (E'c\';d');",
    );
    let report = run(&db, &spy, &[unit], "1.0.0");

    assert!(report.is_complete(), "unexpected failure: {:?}", report.error);
    assert_eq!(spy.statements().len(), 3);
    assert_eq!(count(&db, "SELECT * FROM t WHERE s IN ('a;b', 'c'';d')"), 2);
}

#[test]
fn test_version_only_moves_forward() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store.set_current_version(&version("2.0.0")).unwrap();

    let spy = RecordingDatabase::new(&db);
    let report = run(&db, &spy, &[A], "1.5.0");
    assert!(report.is_complete());
    assert_eq!(store.get_current_version().unwrap(), Some(version("2.0.0")));

    let marker = store.get_marker().unwrap().unwrap();
    assert!(marker.installed);
    assert_eq!(marker.version.as_deref(), Some("2.0.0"));
}

#[test]
fn test_elapsed_timeout_starts_no_unit() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store.bootstrap().unwrap();
    let spy = RecordingDatabase::new(&db);
    let cat = catalog("1.0.0", &[A, C]);
    let planned = plan(&cat, &store.get_all().unwrap());

    let report = MigrationExecutor::new(&spy, &store, &store, &store)
        .with_timeout(Some(Duration::ZERO))
        .execute(&planned, cat.target_version())
        .unwrap();

    assert!(report.timed_out);
    assert!(!report.is_complete());
    assert!(report.applied.is_empty());
    assert_eq!(report.not_attempted, vec!["001_a.sql", "003_c.sql"]);
    assert!(spy.calls().is_empty());
    assert_eq!(store.get_current_version().unwrap(), None);
}

#[test]
fn test_unrepresentable_timeout_means_no_deadline() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = MetaStore::new(&db);
    store.bootstrap().unwrap();
    let spy = RecordingDatabase::new(&db);
    let cat = catalog("1.0.0", &[A, C]);
    let planned = plan(&cat, &store.get_all().unwrap());

    let report = MigrationExecutor::new(&spy, &store, &store, &store)
        .with_timeout(Some(Duration::from_secs(u64::MAX)))
        .execute(&planned, cat.target_version())
        .unwrap();

    assert!(report.is_complete());
    assert!(!report.timed_out);
    assert_eq!(report.applied, vec!["001_a.sql", "003_c.sql"]);
}

#[test]
fn test_into_result_surfaces_unit_failure() {
    let db = DuckDbBackend::in_memory().unwrap();
    let spy = RecordingDatabase::new(&db);
    let report = run(&db, &spy, &[A, B_BROKEN], "1.0.0");

    match report.into_result() {
        Err(EngineError::UnitExecutionFailed { filename, cause }) => {
            assert_eq!(filename, "002_b.sql");
            assert!(!cause.is_empty());
        }
        other => panic!("expected UnitExecutionFailed, got {other:?}"),
    }
}

#[test]
fn test_empty_unit_is_recorded_as_success() {
    let db = DuckDbBackend::in_memory().unwrap();
    let spy = RecordingDatabase::new(&db);
    let report = run(&db, &spy, &[("001_noop.sql", "-- nothing yet\n")], "1.0.0");
    assert_eq!(report.applied, vec!["001_noop.sql"]);
    assert_eq!(spy.calls(), vec!["BEGIN", "COMMIT"]);
}
