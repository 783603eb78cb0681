//! SQLite-backed `KvStore` for durable on-device persistence.
//!
//! # Responsibility
//! - Map whole-value `get/set/remove` onto the single `kv_entries` table.
//! - Keep blocking SQLite calls off the async executor threads.
//!
//! # Invariants
//! - `set` is a single-statement upsert; a reader never sees a partial value.
//! - Busy/locked database errors surface as `KvError::Timeout`.
//! - Deadlines are enforced by SQLite's busy handler inside the worker, and the
//!   worker is always awaited, so a reported outcome is the real outcome.

use super::{KvError, KvResult, KvStore};
use crate::db::{open_db, open_db_in_memory, BUSY_TIMEOUT};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SELECT_VALUE_SQL: &str = "SELECT value FROM kv_entries WHERE key = ?1;";
const UPSERT_VALUE_SQL: &str = "INSERT INTO kv_entries (key, value, updated_at)
     VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
     ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at;";
const DELETE_VALUE_SQL: &str = "DELETE FROM kv_entries WHERE key = ?1;";

/// Durable key-value store over one SQLite connection.
#[derive(Clone)]
pub struct SqliteKvStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    /// Opens (or creates) the database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a throwaway in-memory database.
    pub fn open_in_memory() -> KvResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `op` on the blocking pool with the busy handler capped at `deadline`.
    async fn run<T, F>(&self, deadline: Option<Duration>, op: F) -> KvResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> KvResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| KvError::Unavailable("sqlite connection lock poisoned".to_string()))?;
            let Some(deadline) = deadline else {
                return op(&guard);
            };

            guard.busy_timeout(deadline.min(BUSY_TIMEOUT))?;
            let outcome = op(&guard);
            guard.busy_timeout(BUSY_TIMEOUT)?;
            outcome
        })
        .await
        .map_err(|err| KvError::Io(format!("sqlite worker failed: {err}")))?
    }

    async fn select(&self, key: &str, deadline: Option<Duration>) -> KvResult<Option<Vec<u8>>> {
        let key = key.to_string();
        self.run(deadline, move |conn| {
            let value = conn
                .query_row(SELECT_VALUE_SQL, [key.as_str()], |row| {
                    row.get::<_, Vec<u8>>(0)
                })
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn upsert(&self, key: &str, value: Vec<u8>, deadline: Option<Duration>) -> KvResult<()> {
        let key = key.to_string();
        self.run(deadline, move |conn| {
            conn.execute(UPSERT_VALUE_SQL, params![key, value])?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str, deadline: Option<Duration>) -> KvResult<()> {
        let key = key.to_string();
        self.run(deadline, move |conn| {
            conn.execute(DELETE_VALUE_SQL, [key.as_str()])?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        self.select(key, None).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> KvResult<()> {
        self.upsert(key, value, None).await
    }

    async fn remove(&self, key: &str) -> KvResult<()> {
        self.delete(key, None).await
    }

    async fn get_within(&self, key: &str, deadline: Duration) -> KvResult<Option<Vec<u8>>> {
        self.select(key, Some(deadline)).await
    }

    async fn set_within(&self, key: &str, value: Vec<u8>, deadline: Duration) -> KvResult<()> {
        self.upsert(key, value, Some(deadline)).await
    }

    async fn remove_within(&self, key: &str, deadline: Duration) -> KvResult<()> {
        self.delete(key, Some(deadline)).await
    }
}
