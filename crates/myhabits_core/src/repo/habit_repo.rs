//! Habit collection repository over a single storage key.
//!
//! # Responsibility
//! - Own the wire codec for the collection blob.
//! - Provide strict and lenient reads plus whole-collection writes.
//!
//! # Invariants
//! - The blob is always written as a JSON array of habit records.
//! - A blob that is not such an array is `CorruptState`, never a panic.
//! - Each backing store call honors the configured deadline; a timed-out
//!   write is one the backend guarantees did not land.

use crate::kv::{KvError, KvResult, KvStore};
use crate::model::habit::Habit;
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

pub type HabitResult<T> = Result<T, HabitStoreError>;

/// Failure classes of habit persistence.
#[derive(Debug)]
pub enum HabitStoreError {
    /// Stored blob exists but is not a sequence of habit records.
    CorruptState(String),
    /// The backing store read failed.
    StoreUnavailable(KvError),
    /// The backing store write failed; nothing was committed.
    PersistFailure(KvError),
    /// A bulk save contained the same id twice.
    DuplicateId(String),
    /// The collection could not be encoded.
    Serialization(serde_json::Error),
}

impl Display for HabitStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CorruptState(details) => write!(f, "corrupt habit collection: {details}"),
            Self::StoreUnavailable(err) => write!(f, "habit store unavailable: {err}"),
            Self::PersistFailure(err) => write!(f, "failed to persist habits: {err}"),
            Self::DuplicateId(id) => write!(f, "duplicate habit id: {id}"),
            Self::Serialization(err) => write!(f, "failed to encode habits: {err}"),
        }
    }
}

impl Error for HabitStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreUnavailable(err) | Self::PersistFailure(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::CorruptState(_) | Self::DuplicateId(_) => None,
        }
    }
}

impl From<serde_json::Error> for HabitStoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Decodes a stored blob into an ordered habit collection.
///
/// Records missing `completed` decode as incomplete; records missing `id` or
/// `title`, non-array values and non-UTF-8 bytes are `CorruptState`.
pub fn decode_habits(bytes: &[u8]) -> HabitResult<Vec<Habit>> {
    serde_json::from_slice::<Vec<Habit>>(bytes)
        .map_err(|err| HabitStoreError::CorruptState(err.to_string()))
}

/// Encodes a habit collection into its stored blob form.
pub fn encode_habits(habits: &[Habit]) -> HabitResult<Vec<u8>> {
    Ok(serde_json::to_vec(habits)?)
}

/// Reads and writes the habit collection under one key.
pub struct HabitRepository<K: KvStore + ?Sized> {
    kv: Arc<K>,
    key: String,
    op_timeout: Option<Duration>,
}

impl<K: KvStore + ?Sized> HabitRepository<K> {
    pub fn new(kv: Arc<K>, key: impl Into<String>, op_timeout: Option<Duration>) -> Self {
        Self {
            kv,
            key: key.into(),
            op_timeout,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the collection, reporting every failure class.
    ///
    /// An absent key is an empty collection, not an error.
    pub async fn load(&self) -> HabitResult<Vec<Habit>> {
        let blob = self
            .fetch()
            .await
            .map_err(HabitStoreError::StoreUnavailable)?;

        match blob {
            Some(bytes) => decode_habits(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Reads the collection, folding corrupt or unreadable state into empty.
    pub async fn load_lenient(&self) -> Vec<Habit> {
        match self.load().await {
            Ok(habits) => habits,
            Err(HabitStoreError::CorruptState(details)) => {
                warn!(
                    "event=habits_load module=repo status=corrupt key={} error_code=corrupt_state error={}",
                    self.key, details
                );
                Vec::new()
            }
            Err(err) => {
                error!(
                    "event=habits_load module=repo status=error key={} error_code=store_unavailable error={}",
                    self.key, err
                );
                Vec::new()
            }
        }
    }

    /// Replaces the stored collection with `habits`.
    pub async fn save(&self, habits: &[Habit]) -> HabitResult<()> {
        let blob = encode_habits(habits)?;
        self.store(blob)
            .await
            .map_err(|err| {
                error!(
                    "event=habits_save module=repo status=error key={} count={} error_code=persist_failure error={}",
                    self.key,
                    habits.len(),
                    err
                );
                HabitStoreError::PersistFailure(err)
            })
    }

    /// Deletes the key itself from the backing store.
    pub async fn clear(&self) -> HabitResult<()> {
        self.erase()
            .await
            .map_err(|err| {
                error!(
                    "event=habits_clear module=repo status=error key={} error_code=persist_failure error={}",
                    self.key, err
                );
                HabitStoreError::PersistFailure(err)
            })
    }

    async fn fetch(&self) -> KvResult<Option<Vec<u8>>> {
        match self.op_timeout {
            Some(deadline) => self.kv.get_within(&self.key, deadline).await,
            None => self.kv.get(&self.key).await,
        }
    }

    async fn store(&self, blob: Vec<u8>) -> KvResult<()> {
        match self.op_timeout {
            Some(deadline) => self.kv.set_within(&self.key, blob, deadline).await,
            None => self.kv.set(&self.key, blob).await,
        }
    }

    async fn erase(&self) -> KvResult<()> {
        match self.op_timeout {
            Some(deadline) => self.kv.remove_within(&self.key, deadline).await,
            None => self.kv.remove(&self.key).await,
        }
    }
}
