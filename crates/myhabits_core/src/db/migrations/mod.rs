//! Schema steps for the `kv_entries` table.
//!
//! # Invariants
//! - Step versions are contiguous, starting at 1.
//! - All pending steps and the version stamp commit in one transaction.

use crate::kv::{KvError, KvResult};
use log::info;
use rusqlite::Connection;

/// Ordered schema steps; index `i` upgrades version `i` to `i + 1`.
const STEPS: &[&str] = &[include_str!("0001_kv_entries.sql")];

/// Returns the schema version this build writes.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

/// Upgrades the connection's schema and returns how many steps ran.
///
/// # Errors
/// - `KvError::UnsupportedSchemaVersion` when the file is newer than this build.
pub fn apply_migrations(conn: &mut Connection) -> KvResult<u32> {
    let from: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let to = latest_version();

    if from > to {
        return Err(KvError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: to,
        });
    }
    if from == to {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &STEPS[from as usize..] {
        tx.execute_batch(step)?;
    }
    tx.pragma_update(None, "user_version", to)?;
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from={from} to={to}");
    Ok(to - from)
}
