use fieldvisit_core::db::migrations::{apply_migrations, latest_version};
use fieldvisit_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

fn user_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1;",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        == 1
}

#[test]
fn fresh_database_is_fully_migrated() {
    let conn = open_db_in_memory().unwrap();

    assert!(latest_version() > 0);
    assert_eq!(user_version(&conn), latest_version());
    assert!(table_exists(&conn, "visits"));
    assert!(table_exists(&conn, "tasks"));
}

#[test]
fn migrations_are_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();
    assert_eq!(user_version(&conn), latest_version());
}

#[test]
fn newer_schema_versions_are_rejected() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "PRAGMA user_version = {};",
        latest_version() + 1
    ))
    .unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();
    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion { db_version, latest_supported }
            if db_version == latest_version() + 1 && latest_supported == latest_version()
    ));
}

#[test]
fn reopening_a_database_file_preserves_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldvisit.db");

    {
        let conn = open_db(&path).unwrap();
        assert_eq!(user_version(&conn), latest_version());
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(user_version(&conn), latest_version());
    assert!(table_exists(&conn, "visits"));
}
