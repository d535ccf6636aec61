//! In-memory store with snapshot/restore transactions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::{MemoryStore, PreferenceStore, StoreResult, StoreTx, StudyStore, TaskStore};
use crate::error::StoreError;
use crate::preferences::PreferenceRecord;
use crate::task::{StudyTask, TaskType};

#[derive(Debug, Clone, Default)]
struct Data {
    /// Insertion-ordered
    tasks: Vec<StudyTask>,
    preferences: HashMap<String, PreferenceRecord>,
    intervals: HashMap<(String, String), u32>,
}

#[derive(Debug, Default)]
struct State {
    data: Data,
    /// Fail every write after this many writes within one transaction.
    fail_after_writes: Option<usize>,
}

/// Store kept entirely in process memory.
///
/// Transactions hold the store lock for their whole lifetime, so they are
/// fully serialized. Uncommitted transactions restore the snapshot taken at
/// `begin`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write after the first `writes` in a transaction fail with
    /// `StoreError::QueryFailed`. `None` clears the fault.
    pub fn fail_after_writes(&self, writes: Option<usize>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_after_writes = writes;
        }
    }

    /// Copy of every stored task, in insertion order.
    pub fn all_tasks(&self) -> StoreResult<Vec<StudyTask>> {
        let state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(state.data.tasks.clone())
    }
}

impl StudyStore for InMemoryStore {
    type Tx<'a> = InMemoryTx<'a>;

    fn begin(&self) -> StoreResult<InMemoryTx<'_>> {
        let guard = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        let snapshot = guard.data.clone();
        Ok(InMemoryTx {
            guard,
            snapshot: Some(snapshot),
            writes: 0,
        })
    }
}

/// Open transaction on an [`InMemoryStore`].
pub struct InMemoryTx<'a> {
    guard: MutexGuard<'a, State>,
    snapshot: Option<Data>,
    writes: usize,
}

impl InMemoryTx<'_> {
    fn data(&mut self) -> &mut Data {
        &mut self.guard.data
    }

    fn record_write(&mut self) -> StoreResult<()> {
        if let Some(limit) = self.guard.fail_after_writes {
            if self.writes >= limit {
                return Err(StoreError::QueryFailed("injected write failure".into()));
            }
        }
        self.writes += 1;
        Ok(())
    }
}

impl Drop for InMemoryTx<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.guard.data = snapshot;
        }
    }
}

impl StoreTx for InMemoryTx<'_> {
    fn commit(mut self) -> StoreResult<()> {
        self.snapshot = None;
        Ok(())
    }
}

impl PreferenceStore for InMemoryTx<'_> {
    fn get_preferences(&mut self, user_id: &str) -> StoreResult<Option<PreferenceRecord>> {
        Ok(self.data().preferences.get(user_id).cloned())
    }

    fn set_preferences(&mut self, user_id: &str, record: &PreferenceRecord) -> StoreResult<()> {
        self.record_write()?;
        self.data()
            .preferences
            .insert(user_id.to_string(), record.clone());
        Ok(())
    }
}

impl TaskStore for InMemoryTx<'_> {
    fn count_tasks(&mut self, user_id: &str, date: NaiveDate) -> StoreResult<usize> {
        Ok(self
            .data()
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.scheduled_date == date)
            .count())
    }

    fn upsert_task(&mut self, task: &StudyTask) -> StoreResult<String> {
        self.record_write()?;
        let tasks = &mut self.data().tasks;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task.clone(),
            None => tasks.push(task.clone()),
        }
        Ok(task.id.clone())
    }

    fn list_tasks(&mut self, user_id: &str, after: NaiveDate) -> StoreResult<Vec<StudyTask>> {
        let mut tasks: Vec<StudyTask> = self
            .data()
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.scheduled_date > after)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.scheduled_date);
        Ok(tasks)
    }

    fn tasks_on(&mut self, user_id: &str, date: NaiveDate) -> StoreResult<Vec<StudyTask>> {
        Ok(self
            .data()
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.scheduled_date == date)
            .cloned()
            .collect())
    }

    fn chunk_tasks(&mut self, user_id: &str, chunk_id: &str) -> StoreResult<Vec<StudyTask>> {
        let mut tasks: Vec<StudyTask> = self
            .data()
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.chunk_id == chunk_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.scheduled_date);
        Ok(tasks)
    }

    fn update_task_date(&mut self, task_id: &str, date: NaiveDate) -> StoreResult<()> {
        self.record_write()?;
        match self.data().tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.scheduled_date = date;
                Ok(())
            }
            None => Err(StoreError::QueryFailed(format!("no task with id {task_id}"))),
        }
    }

    fn mark_completed(
        &mut self,
        user_id: &str,
        chunk_id: &str,
        task_type: TaskType,
    ) -> StoreResult<usize> {
        self.record_write()?;
        let earliest = self
            .data()
            .tasks
            .iter_mut()
            .filter(|t| {
                t.user_id == user_id && t.chunk_id == chunk_id && t.task_type == task_type && !t.completed
            })
            .min_by_key(|t| t.scheduled_date);
        match earliest {
            Some(task) => {
                task.completed = true;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

impl MemoryStore for InMemoryTx<'_> {
    fn get_interval(&mut self, user_id: &str, chunk_id: &str) -> StoreResult<Option<u32>> {
        Ok(self
            .data()
            .intervals
            .get(&(user_id.to_string(), chunk_id.to_string()))
            .copied())
    }

    fn set_interval(&mut self, user_id: &str, chunk_id: &str, interval_days: u32) -> StoreResult<()> {
        self.record_write()?;
        self.data()
            .intervals
            .insert((user_id.to_string(), chunk_id.to_string()), interval_days);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn committed_writes_persist() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.upsert_task(&StudyTask::new("u1", "c1", TaskType::Learn, date(1)))
            .unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.count_tasks("u1", date(1)).unwrap(), 1);
        assert_eq!(tx.count_tasks("u2", date(1)).unwrap(), 0);
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        {
            let mut tx = store.begin().unwrap();
            tx.upsert_task(&StudyTask::new("u1", "c1", TaskType::Learn, date(1)))
                .unwrap();
            tx.set_interval("u1", "c1", 4).unwrap();
        }
        assert!(store.all_tasks().unwrap().is_empty());
        let mut tx = store.begin().unwrap();
        assert_eq!(tx.get_interval("u1", "c1").unwrap(), None);
    }

    #[test]
    fn upsert_replaces_by_id() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        let mut task = StudyTask::new("u1", "c1", TaskType::Quiz, date(1));
        tx.upsert_task(&task).unwrap();
        task.scheduled_date = date(3);
        tx.upsert_task(&task).unwrap();
        tx.commit().unwrap();

        let tasks = store.all_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].scheduled_date, date(3));
    }

    #[test]
    fn list_tasks_is_strictly_after_and_date_ordered() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        for day in [5, 2, 3, 2] {
            tx.upsert_task(&StudyTask::new("u1", "c", TaskType::Learn, date(day)))
                .unwrap();
        }
        let listed: Vec<u32> = tx
            .list_tasks("u1", date(2))
            .unwrap()
            .iter()
            .map(|t| chrono::Datelike::day(&t.scheduled_date))
            .collect();
        assert_eq!(listed, vec![3, 5]);
    }

    #[test]
    fn mark_completed_only_touches_pending_matches() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.upsert_task(&StudyTask::new("u1", "c1", TaskType::Review, date(1)))
            .unwrap();
        tx.upsert_task(&StudyTask::new("u1", "c1", TaskType::Quiz, date(1)))
            .unwrap();
        assert_eq!(tx.mark_completed("u1", "c1", TaskType::Review).unwrap(), 1);
        assert_eq!(tx.mark_completed("u1", "c1", TaskType::Review).unwrap(), 0);
    }

    #[test]
    fn mark_completed_flips_only_the_earliest_match() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        let later = StudyTask::new("u1", "c1", TaskType::Review, date(9));
        let earlier = StudyTask::new("u1", "c1", TaskType::Review, date(4));
        tx.upsert_task(&later).unwrap();
        tx.upsert_task(&earlier).unwrap();

        assert_eq!(tx.mark_completed("u1", "c1", TaskType::Review).unwrap(), 1);
        let history = tx.chunk_tasks("u1", "c1").unwrap();
        assert_eq!(history[0].id, earlier.id);
        assert!(history[0].completed);
        assert!(history[1].is_pending());
    }

    #[test]
    fn injected_failure_surfaces_as_query_failed() {
        let store = InMemoryStore::new();
        store.fail_after_writes(Some(1));
        let mut tx = store.begin().unwrap();
        tx.set_interval("u1", "c1", 2).unwrap();
        let err = tx.set_interval("u1", "c1", 4).unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }
}
