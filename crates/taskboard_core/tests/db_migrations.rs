use rusqlite::Connection;
use taskboard_core::db::migrations::latest_version;
use taskboard_core::db::{open_db, open_db_in_memory, DbError};

const INIT_SQL: &str = include_str!("../src/db/migrations/0001_init.sql");

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "users",
        "projects",
        "tasks",
        "tags",
        "documents",
        "task_documents",
        "task_tags",
        "repeating_tasks",
        "repeating_task_checks",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn returned_connection_enforces_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO projects (user_id, name, created_at) VALUES (42, 'orphan', '2024-01-01 00:00:00');",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskboard.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "repeating_task_checks");
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
fn upgrade_removes_duplicate_checks_before_adding_unique_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(INIT_SQL).unwrap();
    conn.execute_batch(
        "PRAGMA user_version = 1;
         INSERT INTO users (id, username, email, password_hash) VALUES (1, 'ann', 'ann@example.com', 'h');
         INSERT INTO projects (id, user_id, name, created_at) VALUES (1, 1, 'home', '2024-01-01 00:00:00');
         INSERT INTO repeating_tasks (id, project_id, title, created_at, interval_days)
             VALUES (1, 1, 'water plants', '2024-01-01 00:00:00', 1);
         INSERT INTO repeating_task_checks (task_id, date) VALUES (1, '2024-01-02');
         INSERT INTO repeating_task_checks (task_id, date) VALUES (1, '2024-01-02');
         INSERT INTO repeating_task_checks (task_id, date) VALUES (1, '2024-01-03');",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());

    let rows: Vec<(i64, String)> = conn
        .prepare("SELECT id, date FROM repeating_task_checks ORDER BY id;")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![(1, "2024-01-02".to_string()), (3, "2024-01-03".to_string())]
    );

    let duplicate = conn.execute(
        "INSERT INTO repeating_task_checks (task_id, date) VALUES (1, '2024-01-03');",
        [],
    );
    assert!(duplicate.is_err());
}

#[test]
fn failed_schema_step_is_named_and_keeps_previous_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.db");

    // Claims version 1 without the tables step 2 rewrites.
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::Migration { version, name, .. } => {
            assert_eq!(version, 2);
            assert_eq!(name, "unique_checks");
        }
        other => panic!("unexpected error: {other}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 1);
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
