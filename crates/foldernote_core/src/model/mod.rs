//! Domain model for folders and the notes they contain.
//!
//! # Responsibility
//! - Define canonical data structures used by hierarchy logic.
//! - Keep derived read views separate from persisted rows.
//!
//! # Invariants
//! - Every folder and note is identified by a stable UUID.
//! - Deletion is a hard delete with cascading reattachment, not a tombstone.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod folder;
pub mod note;

/// Returns the current wall-clock time in epoch milliseconds.
///
/// Clocks before the unix epoch collapse to `0`.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
