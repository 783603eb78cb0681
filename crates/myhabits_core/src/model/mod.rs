//! Domain model for persisted habits.
//!
//! # Responsibility
//! - Define the canonical habit record stored in the collection blob.
//! - Own id minting and creation timestamp formatting.
//!
//! # Invariants
//! - Every habit is identified by a stable `HabitId` that is never reused.
//! - Deletion is a hard delete; there are no tombstones.

pub mod habit;
