use super::*;

#[test]
fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[test]
fn test_new_handles_memory_path() {
    let db = DuckDbBackend::new(":memory:").unwrap();
    db.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();
    assert!(db.relation_exists("t").unwrap());
}

#[test]
fn test_from_path_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keel.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute_batch("CREATE TABLE persisted (id INTEGER)").unwrap();
    }
    assert!(path.exists());
    let db = DuckDbBackend::from_path(&path).unwrap();
    assert!(db.relation_exists("persisted").unwrap());
}

#[test]
fn test_from_path_missing_parent_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no").join("such").join("dir").join("keel.duckdb");
    let err = DuckDbBackend::from_path(&path).err().unwrap();
    assert!(err.is_unavailable());
}

#[test]
fn test_query_count_counts_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE nums (n INTEGER); INSERT INTO nums VALUES (1), (2), (3);")
        .unwrap();
    assert_eq!(db.query_count("SELECT * FROM nums").unwrap(), 3);
}

#[test]
fn test_relation_exists_schema_qualified() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE SCHEMA s; CREATE TABLE s.t (id INTEGER);")
        .unwrap();
    assert!(db.relation_exists("s.t").unwrap());
    assert!(!db.relation_exists("t").unwrap());
    assert!(!db.relation_exists("s.missing").unwrap());
}

#[test]
fn test_commit_persists() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.begin().unwrap();
    db.execute_batch("CREATE TABLE committed (id INTEGER)").unwrap();
    db.commit().unwrap();
    assert!(db.relation_exists("committed").unwrap());
}

#[test]
fn test_rollback_discards_ddl_and_dml() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE keep (id INTEGER)").unwrap();

    db.begin().unwrap();
    db.execute_batch("CREATE TABLE discarded (id INTEGER)").unwrap();
    db.execute_batch("INSERT INTO keep VALUES (1)").unwrap();
    db.rollback().unwrap();

    assert!(!db.relation_exists("discarded").unwrap());
    assert_eq!(db.query_count("SELECT * FROM keep").unwrap(), 0);
}

#[test]
fn test_commit_without_transaction_errors() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.commit().unwrap_err();
    assert!(matches!(err, DbError::TransactionError { .. }));
}

#[test]
fn test_execution_error_is_not_unavailable() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.execute_batch("SELEC nonsense").unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(_)));
    assert!(!err.is_unavailable());
}

#[test]
fn test_with_conn_exposes_connection() {
    let db = DuckDbBackend::in_memory().unwrap();
    let value: i64 = db
        .with_conn(|conn| -> DbResult<i64> {
            Ok(conn.query_row("SELECT 41 + 1", [], |row| row.get(0))?)
        })
        .unwrap();
    assert_eq!(value, 42);
}
