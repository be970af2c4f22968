use storyflow_core::db::migrations::{latest_version, missing_board_tables, schema_version};
use storyflow_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert!(missing_board_tables(&conn).unwrap().is_empty());
}

#[test]
fn fresh_connection_reports_missing_board_tables() {
    let conn = Connection::open_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), 0);
    assert_eq!(missing_board_tables(&conn).unwrap(), vec!["boards"]);
}

#[test]
fn reopening_file_database_keeps_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storyflow.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO boards (board_id, title, document, created_at, updated_at)
             VALUES ('b1', 'Trip', '{}', 1, 1);",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM boards;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn boards_table_rejects_empty_key() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO boards (board_id, title, document, created_at, updated_at)
         VALUES ('', 'x', '{}', 1, 1);",
        [],
    );
    assert!(result.is_err());
}
