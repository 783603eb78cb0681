//! Habit store configuration.
//!
//! # Invariants
//! - `storage_key` names the one key the collection blob lives under.
//! - `WriteOrdering::Serialized` is the default.

use std::time::Duration;

/// Versioned namespace key for the habit collection blob.
pub const DEFAULT_STORAGE_KEY: &str = "myhabits:habits";

/// How concurrent operations against the same storage key are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteOrdering {
    /// Operations on one key run one at a time, in invocation order.
    #[default]
    Serialized,
    /// Unprotected read-modify-write. Concurrent writers may lose updates.
    Unserialized,
}

/// Options for `HabitStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitStoreConfig {
    pub storage_key: String,
    pub write_ordering: WriteOrdering,
    /// Deadline applied to each backing store call. `None` waits indefinitely.
    pub op_timeout: Option<Duration>,
}

impl Default for HabitStoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            write_ordering: WriteOrdering::default(),
            op_timeout: None,
        }
    }
}

impl HabitStoreConfig {
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_write_ordering(mut self, ordering: WriteOrdering) -> Self {
        self.write_ordering = ordering;
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }
}
