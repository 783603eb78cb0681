//! Repository layer over the key-value blob store.
//!
//! # Responsibility
//! - Encode/decode the habit collection blob.
//! - Classify backing store failures into read vs write outcomes.
//!
//! # Invariants
//! - Reads fail open: absent, corrupt or unreadable blobs become an empty collection.
//! - Writes fail closed: a failed write is always reported to the caller.

pub mod habit_repo;
