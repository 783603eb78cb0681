//! Key-value blob store contract and implementations.
//!
//! # Responsibility
//! - Define the whole-value `get/set/remove` seam the habit store persists through.
//! - Provide an in-memory backend and a durable SQLite backend.
//!
//! # Invariants
//! - Values are opaque bytes; no partial updates and no cross-key transactions.
//! - Every call may fail with `KvError`; callers decide whether to recover.
//! - A `*_within` call that reports `Timeout` left the stored value unchanged.

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

mod memory;
pub mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

pub type KvResult<T> = Result<T, KvError>;

/// I/O-level failure raised by a key-value backend.
#[derive(Debug)]
pub enum KvError {
    Sqlite(rusqlite::Error),
    /// The on-disk `kv_entries` schema was written by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The backend did not answer in time (busy database or elapsed deadline).
    Timeout,
    /// Backend worker failed outside the storage engine itself.
    Io(String),
    Unavailable(String),
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "kv schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Timeout => write!(f, "key-value store timed out"),
            Self::Io(message) => write!(f, "key-value store i/o failure: {message}"),
            Self::Unavailable(message) => write!(f, "key-value store unavailable: {message}"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        if is_busy(&value) {
            return Self::Timeout;
        }
        Self::Sqlite(value)
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}

/// Durable, process-local blob store keyed by string.
///
/// The `*_within` variants bound a call by `deadline`. The provided versions
/// drop the pending call on expiry, which is only sound for backends whose
/// futures do all their work while polled. Backends that hand work to another
/// thread must override them and enforce the deadline at the source.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the value under `key`, or `None` when the key is absent.
    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>>;
    /// Replaces the whole value under `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> KvResult<()>;
    /// Removes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> KvResult<()>;

    async fn get_within(&self, key: &str, deadline: Duration) -> KvResult<Option<Vec<u8>>> {
        tokio::time::timeout(deadline, self.get(key))
            .await
            .map_err(|_| KvError::Timeout)?
    }

    async fn set_within(&self, key: &str, value: Vec<u8>, deadline: Duration) -> KvResult<()> {
        tokio::time::timeout(deadline, self.set(key, value))
            .await
            .map_err(|_| KvError::Timeout)?
    }

    async fn remove_within(&self, key: &str, deadline: Duration) -> KvResult<()> {
        tokio::time::timeout(deadline, self.remove(key))
            .await
            .map_err(|_| KvError::Timeout)?
    }
}
