//! Store interfaces consumed by the scheduling core.
//!
//! The core never talks to a database directly. Every operation receives an
//! explicit store handle, opens a transaction with [`StudyStore::begin`], and
//! performs all reads and writes through the returned [`StoreTx`]. Dropping a
//! transaction without calling [`StoreTx::commit`] discards its writes.
//!
//! Implementations:
//! - [`InMemoryStore`]: snapshot/restore store for tests and embedding
//! - [`crate::storage::StudyDb`]: SQLite

pub mod memory;

use chrono::NaiveDate;

use crate::error::StoreError;
use crate::preferences::PreferenceRecord;
use crate::task::{StudyTask, TaskType};

pub use memory::InMemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Per-user study preferences.
pub trait PreferenceStore {
    /// Raw stored preferences, or `None` if the user never set any.
    fn get_preferences(&mut self, user_id: &str) -> StoreResult<Option<PreferenceRecord>>;

    fn set_preferences(&mut self, user_id: &str, record: &PreferenceRecord) -> StoreResult<()>;
}

/// Persisted study tasks.
pub trait TaskStore {
    /// Number of tasks (pending or completed) scheduled for a user on `date`.
    fn count_tasks(&mut self, user_id: &str, date: NaiveDate) -> StoreResult<usize>;

    /// Insert or replace a task by id. Returns the id.
    fn upsert_task(&mut self, task: &StudyTask) -> StoreResult<String>;

    /// Tasks scheduled strictly after `after`, ordered by date then insertion.
    fn list_tasks(&mut self, user_id: &str, after: NaiveDate) -> StoreResult<Vec<StudyTask>>;

    /// Tasks scheduled on exactly `date`, in insertion order.
    fn tasks_on(&mut self, user_id: &str, date: NaiveDate) -> StoreResult<Vec<StudyTask>>;

    /// All tasks referencing one chunk, ordered by date.
    fn chunk_tasks(&mut self, user_id: &str, chunk_id: &str) -> StoreResult<Vec<StudyTask>>;

    fn update_task_date(&mut self, task_id: &str, date: NaiveDate) -> StoreResult<()>;

    /// Flip the earliest pending task of `(user, chunk, type)` to completed.
    /// Returns 1, or 0 when no pending task matches.
    fn mark_completed(
        &mut self,
        user_id: &str,
        chunk_id: &str,
        task_type: TaskType,
    ) -> StoreResult<usize>;
}

/// Per-user-per-chunk review spacing.
pub trait MemoryStore {
    fn get_interval(&mut self, user_id: &str, chunk_id: &str) -> StoreResult<Option<u32>>;

    fn set_interval(&mut self, user_id: &str, chunk_id: &str, interval_days: u32) -> StoreResult<()>;
}

/// An open transaction over all three stores.
pub trait StoreTx: PreferenceStore + TaskStore + MemoryStore {
    fn commit(self) -> StoreResult<()>;
}

/// A shareable store handle that hands out transactions.
pub trait StudyStore: Send + Sync {
    type Tx<'a>: StoreTx
    where
        Self: 'a;

    /// Begin a transaction. Blocks while another transaction is open.
    fn begin(&self) -> StoreResult<Self::Tx<'_>>;
}
