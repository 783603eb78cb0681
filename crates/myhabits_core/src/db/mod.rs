//! SQLite bootstrap for the on-device key-value table.
//!
//! # Responsibility
//! - Open connections backing `SqliteKvStore`.
//! - Bring the `kv_entries` schema up to date before first use.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - A database stamped by a newer build is refused, never downgraded.

pub mod migrations;
mod open;

pub(crate) use open::BUSY_TIMEOUT;
pub use open::{open_db, open_db_in_memory};
