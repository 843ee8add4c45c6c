use nexusnote_core::db::migrations::{latest_version, VAULT_TABLES};
use nexusnote_core::db::{open_db, open_db_in_memory, verify_vault_schema, DbError};
use nexusnote_core::{SqliteNoteStore, StoreError};
use rusqlite::Connection;

#[test]
fn fresh_vault_carries_every_table_and_lookup_index() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(user_version(&conn), latest_version());
    for table in VAULT_TABLES {
        assert!(has_object(&conn, "table", table), "missing table {table}");
    }
    assert!(has_object(&conn, "index", "idx_entries_path"));
    assert!(has_object(&conn, "index", "idx_entries_name"));
    verify_vault_schema(&conn).unwrap();
}

#[test]
fn reopening_vault_file_keeps_stored_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nexusnote.sqlite3");

    let first = open_db(&path).unwrap();
    first
        .execute(
            "INSERT INTO entries (id, path, name, content, is_directory)
             VALUES ('n1', 'nexusnote/A.md', 'A.md', 'body', 0);",
            [],
        )
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(user_version(&second), latest_version());
    let content: String = second
        .query_row("SELECT content FROM entries WHERE id = 'n1';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(content, "body");
}

#[test]
fn vault_file_from_newer_build_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
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
fn open_failure_names_the_vault_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("vault.sqlite3");

    match open_db(&path).unwrap_err() {
        DbError::Open { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteNoteStore::try_new(conn).err().unwrap();
    match err {
        StoreError::Db(DbError::SchemaNotReady { expected, actual }) => {
            assert_eq!(expected, latest_version());
            assert_eq!(actual, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn store_rejects_vault_missing_rename_journal() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE pending_renames;").unwrap();

    let err = SqliteNoteStore::try_new(conn).err().unwrap();
    assert!(matches!(
        err,
        StoreError::Db(DbError::MissingTable("pending_renames"))
    ));
}

#[test]
fn is_directory_column_rejects_values_outside_bool_range() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO entries (id, path, name, is_directory) VALUES ('x', 'nexusnote/x', 'x', 2);",
        [],
    );
    assert!(result.is_err());
}

fn user_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn has_object(conn: &Connection, kind: &str, name: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);",
        [kind, name],
        |row| row.get(0),
    )
    .unwrap()
}
