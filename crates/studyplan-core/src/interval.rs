//! Per-user-per-chunk review spacing.
//!
//! The interval doubles on every correct answer and resets to one day on a
//! miss. There is no time-based decay: the next value depends only on the
//! previous value and the correctness signal.

use crate::store::{MemoryStore, StoreResult};

/// Interval assumed for a chunk that has no memory record yet.
pub const DEFAULT_INTERVAL_DAYS: u32 = 1;

/// Longest interval the doubling can reach.
pub const MAX_INTERVAL_DAYS: u32 = 365;

/// Next interval after an outcome, capped at [`MAX_INTERVAL_DAYS`].
pub fn next_interval(previous: u32, correct: bool) -> u32 {
    if correct {
        previous.max(1).saturating_mul(2).min(MAX_INTERVAL_DAYS)
    } else {
        DEFAULT_INTERVAL_DAYS
    }
}

/// Current interval, or the default if none is stored.
pub fn get_interval<M>(store: &mut M, user_id: &str, chunk_id: &str) -> StoreResult<u32>
where
    M: MemoryStore + ?Sized,
{
    Ok(store
        .get_interval(user_id, chunk_id)?
        .unwrap_or(DEFAULT_INTERVAL_DAYS))
}

/// Apply an outcome, persist the result and return it.
pub fn update_interval<M>(
    store: &mut M,
    user_id: &str,
    chunk_id: &str,
    correct: bool,
) -> StoreResult<u32>
where
    M: MemoryStore + ?Sized,
{
    let previous = get_interval(store, user_id, chunk_id)?;
    let next = next_interval(previous, correct);
    store.set_interval(user_id, chunk_id, next)?;
    tracing::debug!(user_id, chunk_id, previous, next, correct, "interval updated");
    Ok(next)
}
