use myhabits_core::db::migrations::{apply_migrations, latest_version};
use myhabits_core::db::{open_db, open_db_in_memory};
use myhabits_core::{
    HabitStore, HabitStoreConfig, HabitStoreError, KvError, KvStore, MutationOutcome,
    SqliteKvStore,
};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "kv_entries");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("myhabits.db");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_table_exists(&second, "kv_entries");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        KvError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = SqliteKvStore::open(&path).err().unwrap();
    assert!(matches!(err, KvError::UnsupportedSchemaVersion { .. }));
}

#[test]
fn migrations_run_once_per_database() {
    let mut conn = open_db_in_memory().unwrap();

    assert_eq!(apply_migrations(&mut conn).unwrap(), 0);

    let mut fresh = Connection::open_in_memory().unwrap();
    assert_eq!(apply_migrations(&mut fresh).unwrap(), latest_version());
    assert_eq!(apply_migrations(&mut fresh).unwrap(), 0);
    assert_table_exists(&fresh, "kv_entries");
}

#[tokio::test]
async fn timed_out_writes_against_locked_file_do_not_land() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.db");
    let store = HabitStore::with_config(
        Arc::new(SqliteKvStore::open(&path).unwrap()),
        HabitStoreConfig::default()
            .with_storage_key("myhabits:habits:locked")
            .with_op_timeout(Duration::from_millis(50)),
    );
    let kept = store.create("Kept").await.unwrap();

    let locker = Connection::open(&path).unwrap();
    locker.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let err = store.create("Ghost").await.unwrap_err();
    assert!(matches!(
        err,
        HabitStoreError::PersistFailure(KvError::Timeout)
    ));
    assert_eq!(
        store.update(&kept.id, "Renamed").await,
        MutationOutcome::PersistFailure
    );
    assert_eq!(
        store.toggle_completion(&kept.id).await,
        MutationOutcome::PersistFailure
    );
    assert_eq!(store.remove(&kept.id).await, MutationOutcome::PersistFailure);
    assert!(!store.clear().await);

    locker.execute_batch("ROLLBACK;").unwrap();

    assert_eq!(store.list().await, vec![kept]);
}

#[tokio::test]
async fn kv_set_get_remove_roundtrip() {
    let kv = SqliteKvStore::open_in_memory().unwrap();

    assert_eq!(kv.get("k").await.unwrap(), None);
    kv.set("k", b"first".to_vec()).await.unwrap();
    kv.set("k", b"second".to_vec()).await.unwrap();
    assert_eq!(kv.get("k").await.unwrap(), Some(b"second".to_vec()));

    kv.remove("k").await.unwrap();
    kv.remove("k").await.unwrap();
    assert_eq!(kv.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn habits_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habits.db");

    let created = {
        let store = HabitStore::new(Arc::new(SqliteKvStore::open(&path).unwrap()));
        let water = store.create("Drink water").await.unwrap();
        let walk = store.create("Walk").await.unwrap();
        store.toggle_completion(&walk.id).await;
        vec![water, walk]
    };

    let reopened = HabitStore::new(Arc::new(SqliteKvStore::open(&path).unwrap()));
    let habits = reopened.list().await;
    assert_eq!(habits.len(), 2);
    assert_eq!(habits[0], created[0]);
    assert_eq!(habits[1].id, created[1].id);
    assert!(habits[1].completed);
}

#[tokio::test]
async fn stored_blob_is_utf8_json_array() {
    let kv = Arc::new(SqliteKvStore::open_in_memory().unwrap());
    let store = HabitStore::new(Arc::clone(&kv));
    let habit = store.create("Drink water").await.unwrap();

    let blob = kv.get(store.storage_key()).await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&blob).unwrap();
    assert_eq!(value[0]["id"], habit.id.as_str());
    assert_eq!(value[0]["title"], "Drink water");
    assert_eq!(value[0]["completed"], false);
    assert!(value[0]["createdAt"].is_string());

    assert!(store.clear().await);
    assert_eq!(kv.get(store.storage_key()).await.unwrap(), None);
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
