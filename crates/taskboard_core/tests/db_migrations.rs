use rusqlite::Connection;
use taskboard_core::db::migrations::latest_version;
use taskboard_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_creates_board_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "board_items");
    assert_index_exists(&conn, "idx_board_items_area_stage_rank");
}

#[test]
fn reopening_file_database_keeps_version_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskboard.db");

    let first = open_db(&path).unwrap();
    first
        .execute(
            "INSERT INTO board_items (item_uuid, work_area_uuid, stage, sort_rank, title)
             VALUES ('00000000-0000-4000-8000-000000000001',
                     '00000000-0000-4000-8000-0000000000aa',
                     'backlog', 0, 'seed');",
            [],
        )
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    let count: i64 = second
        .query_row("SELECT COUNT(*) FROM board_items;", [], |row| row.get(0))
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
fn schema_rejects_unknown_stage_values() {
    let conn = open_db_in_memory().unwrap();

    let result = conn.execute(
        "INSERT INTO board_items (item_uuid, work_area_uuid, stage, sort_rank, title)
         VALUES ('00000000-0000-4000-8000-000000000002',
                 '00000000-0000-4000-8000-0000000000aa',
                 'archived', 0, 'bad');",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_schema_object(conn, "table", table_name);
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert_schema_object(conn, "index", index_name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
