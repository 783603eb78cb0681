//! Habit store use-case service.
//!
//! # Responsibility
//! - Expose list/create/update/toggle/remove/clear over one collection blob.
//! - Run every mutation as a full read-decode-mutate-encode-write cycle.
//! - Serialize operations per storage key when configured to.
//!
//! # Invariants
//! - Mutations always read fresh state; nothing is cached between calls.
//! - A not-found mutation never rewrites the stored blob.
//! - Under `WriteOrdering::Serialized`, operations on one key run in
//!   invocation order and observe all effects of earlier operations.
//! - Log lines carry ids and counts only, never habit titles.

use crate::config::{HabitStoreConfig, WriteOrdering};
use crate::kv::KvStore;
use crate::model::habit::{mint_unique_habit_id, Habit};
use crate::repo::habit_repo::{HabitRepository, HabitResult, HabitStoreError};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

/// Process-wide FIFO gates, one per storage key.
///
/// Entries are never evicted, so the map holds one gate per distinct key used
/// in this process; callers are expected to use a small fixed set of keys.
static KEY_GATES: Lazy<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn key_gate(key: &str) -> Arc<AsyncMutex<()>> {
    let mut gates = KEY_GATES.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(
        gates
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
    )
}

/// Outcome class of an id-targeted mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The record was changed and the collection written back.
    Updated,
    /// No record had the requested id; the store was left untouched.
    NotFound,
    /// The record was found but the write-back failed.
    PersistFailure,
}

impl MutationOutcome {
    pub fn succeeded(self) -> bool {
        self == Self::Updated
    }
}

impl From<MutationOutcome> for bool {
    fn from(value: MutationOutcome) -> Self {
        value.succeeded()
    }
}

/// Counts shown in the list header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HabitSummary {
    pub total: usize,
    pub completed: usize,
}

/// Façade over the habit collection stored under one key.
pub struct HabitStore<K: KvStore + ?Sized> {
    repo: HabitRepository<K>,
    gate: Option<Arc<AsyncMutex<()>>>,
}

impl<K: KvStore + ?Sized> HabitStore<K> {
    /// Creates a store with the default key and serialized write ordering.
    pub fn new(kv: Arc<K>) -> Self {
        Self::with_config(kv, HabitStoreConfig::default())
    }

    pub fn with_config(kv: Arc<K>, config: HabitStoreConfig) -> Self {
        let gate = match config.write_ordering {
            WriteOrdering::Serialized => Some(key_gate(&config.storage_key)),
            WriteOrdering::Unserialized => None,
        };
        Self {
            repo: HabitRepository::new(kv, config.storage_key, config.op_timeout),
            gate,
        }
    }

    pub fn storage_key(&self) -> &str {
        self.repo.key()
    }

    /// Returns all habits in insertion order.
    ///
    /// Absent, corrupt or unreadable state yields an empty list.
    pub async fn list(&self) -> Vec<Habit> {
        let _turn = self.turn().await;
        self.repo.load_lenient().await
    }

    /// Returns the first habit with `id`, if any.
    pub async fn get(&self, id: &str) -> Option<Habit> {
        let _turn = self.turn().await;
        self.repo
            .load_lenient()
            .await
            .into_iter()
            .find(|habit| habit.id == id)
    }

    /// Returns total and completed counts.
    pub async fn summary(&self) -> HabitSummary {
        let _turn = self.turn().await;
        let habits = self.repo.load_lenient().await;
        HabitSummary {
            total: habits.len(),
            completed: habits.iter().filter(|habit| habit.completed).count(),
        }
    }

    /// Appends a new incomplete habit and persists the collection.
    ///
    /// The title is trimmed; an empty result is stored as-is.
    ///
    /// # Errors
    /// - `PersistFailure` when the write-back fails. The habit does not exist.
    pub async fn create(&self, title: &str) -> HabitResult<Habit> {
        let _turn = self.turn().await;
        let mut habits = self.repo.load_lenient().await;

        let habit = Habit::with_id(mint_unique_habit_id(&habits), title.trim());
        habits.push(habit.clone());
        self.repo.save(&habits).await?;

        info!(
            "event=habit_create module=service status=ok id={} count={}",
            habit.id,
            habits.len()
        );
        Ok(habit)
    }

    /// Replaces the title of the habit with `id`, leaving other fields intact.
    pub async fn update(&self, id: &str, new_title: &str) -> MutationOutcome {
        self.modify("habit_update", id, |habits| {
            let Some(habit) = habits.iter_mut().find(|habit| habit.id == id) else {
                return false;
            };
            habit.title = new_title.to_string();
            true
        })
        .await
    }

    /// Flips `completed` on the habit with `id`.
    ///
    /// Calling this twice restores the original state.
    pub async fn toggle_completion(&self, id: &str) -> MutationOutcome {
        self.modify("habit_toggle", id, |habits| {
            match habits.iter_mut().find(|habit| habit.id == id) {
                Some(habit) => {
                    habit.toggle();
                    true
                }
                None => false,
            }
        })
        .await
    }

    /// Permanently removes the habit with `id`.
    pub async fn remove(&self, id: &str) -> MutationOutcome {
        self.modify("habit_remove", id, |habits| {
            let before = habits.len();
            habits.retain(|habit| habit.id != id);
            habits.len() != before
        })
        .await
    }

    /// Deletes the storage key itself.
    pub async fn clear(&self) -> bool {
        let _turn = self.turn().await;
        match self.repo.clear().await {
            Ok(()) => {
                info!(
                    "event=habits_clear module=service status=ok key={}",
                    self.repo.key()
                );
                true
            }
            Err(_) => false,
        }
    }

    /// Overwrites the whole collection with `habits`, keeping their order.
    ///
    /// # Errors
    /// - `DuplicateId` when two records share an id. Nothing is written.
    /// - `PersistFailure` when the write fails.
    pub async fn replace_all(&self, habits: &[Habit]) -> HabitResult<()> {
        let mut seen = HashSet::with_capacity(habits.len());
        if let Some(duplicate) = habits.iter().find(|habit| !seen.insert(habit.id.as_str())) {
            warn!(
                "event=habits_replace module=service status=error id={} error_code=duplicate_id",
                duplicate.id
            );
            return Err(HabitStoreError::DuplicateId(duplicate.id.clone()));
        }

        let _turn = self.turn().await;
        self.repo.save(habits).await?;
        info!(
            "event=habits_replace module=service status=ok count={}",
            habits.len()
        );
        Ok(())
    }

    async fn modify<F>(&self, event: &str, id: &str, apply: F) -> MutationOutcome
    where
        F: FnOnce(&mut Vec<Habit>) -> bool,
    {
        let _turn = self.turn().await;
        let mut habits = self.repo.load_lenient().await;

        if !apply(&mut habits) {
            debug!("event={event} module=service status=not_found id={id}");
            return MutationOutcome::NotFound;
        }

        match self.repo.save(&habits).await {
            Ok(()) => {
                info!("event={event} module=service status=ok id={id}");
                MutationOutcome::Updated
            }
            Err(_) => MutationOutcome::PersistFailure,
        }
    }

    async fn turn(&self) -> Option<AsyncMutexGuard<'_, ()>> {
        match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }
}
