//! Habit persistence core for MyHabits.
//! This crate is the single source of truth for the stored habit collection.

pub mod config;
pub mod db;
pub mod kv;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{HabitStoreConfig, WriteOrdering, DEFAULT_STORAGE_KEY};
pub use kv::{KvError, KvResult, KvStore, MemoryKvStore, SqliteKvStore};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::habit::{Habit, HabitId};
pub use repo::habit_repo::{
    decode_habits, encode_habits, HabitRepository, HabitResult, HabitStoreError,
};
pub use service::habit_service::{HabitStore, HabitSummary, MutationOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
