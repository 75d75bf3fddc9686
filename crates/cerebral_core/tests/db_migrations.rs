use cerebral_core::db::migrations::latest_version;
use cerebral_core::db::{open_db, open_db_in_memory, DbError};
use cerebral_core::{CollectionId, SqliteItemStore, StoreError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_every_collection_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for collection in CollectionId::ALL {
        assert_table_exists(&conn, collection.table_name());
    }
    assert!(SqliteItemStore::try_new(&conn).is_ok());
}

#[test]
fn reopening_file_database_keeps_rows_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cerebral.sqlite3");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO venues (domain, category, title, location, created_at, updated_at)
         VALUES ('physical', 'restaurants', 'Noma', 'Copenhagen', 1, 1);",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM venues;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn newer_schema_version_is_rejected() {
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
fn store_rejects_connection_missing_a_table() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE practices;").unwrap();

    match SqliteItemStore::try_new(&conn) {
        Err(StoreError::MissingRequiredTable(table)) => assert_eq!(table, "practices"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("store accepted an incomplete schema"),
    }
}

#[test]
fn check_constraints_guard_status_and_rating() {
    let conn = open_db_in_memory().unwrap();

    let bad_rating = conn.execute(
        "INSERT INTO media (domain, category, title, rating, created_at, updated_at)
         VALUES ('emotional', 'movies', 'Heat', 6, 1, 1);",
        [],
    );
    assert!(bad_rating.is_err());

    let bad_status = conn.execute(
        "INSERT INTO media (domain, category, title, status, created_at, updated_at)
         VALUES ('emotional', 'movies', 'Heat', 'done', 1, 1);",
        [],
    );
    assert!(bad_status.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
