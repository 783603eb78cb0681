//! Habit domain model.
//!
//! # Responsibility
//! - Define the record shape shared by every reader/writer of the habit blob.
//! - Mint collision-free ids and ISO-8601 creation timestamps.
//!
//! # Invariants
//! - `id` is assigned once at creation and never changes.
//! - `completed` defaults to `false` when absent from stored data.
//! - `created_at` is informational only; no behavior depends on it.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const HABIT_ID_PREFIX: &str = "habit";
const HABIT_ID_SUFFIX_LEN: usize = 9;

/// Opaque habit identifier, e.g. `habit_1700000000000_ab12cd3ef`.
///
/// Kept as a type alias so foreign ids written by other implementations
/// round-trip unchanged.
pub type HabitId = String;

/// A user-defined trackable item.
///
/// Field names on the wire match the shared collection format, so a blob
/// written by any client can be read back here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    /// RFC 3339 UTC timestamp with millisecond precision.
    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

impl Habit {
    /// Creates an incomplete habit with a freshly minted id and `createdAt=now`.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(mint_habit_id(), title)
    }

    /// Creates an incomplete habit with a caller-provided id.
    ///
    /// Used when the id was minted against an existing collection.
    pub fn with_id(id: impl Into<HabitId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed: false,
            created_at: Some(now_timestamp()),
        }
    }

    /// Flips `completed` and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.completed = !self.completed;
        self.completed
    }
}

/// Mints a new habit id from the current wall clock and a v4 UUID suffix.
pub fn mint_habit_id() -> HabitId {
    let millis = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{HABIT_ID_PREFIX}_{millis}_{}",
        &random[..HABIT_ID_SUFFIX_LEN]
    )
}

/// Mints an id that does not appear in `existing`.
pub fn mint_unique_habit_id(existing: &[Habit]) -> HabitId {
    loop {
        let candidate = mint_habit_id();
        if !existing.iter().any(|habit| habit.id == candidate) {
            return candidate;
        }
    }
}

/// Current UTC time formatted like `2023-11-14T12:00:00.000Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
