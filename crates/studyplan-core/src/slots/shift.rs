//! Forward reflow of queued tasks after an insertion.
//!
//! Every pending task strictly after the insertion date moves to a later
//! study day. Completed tasks are history and never move.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SlotFinder;
use crate::error::Result;
use crate::preferences::UserPreferences;
use crate::store::TaskStore;

/// How [`SlotFinder::shift_forward`] picks each destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftMode {
    /// Do not reflow
    Off,
    /// Next study weekday after the task's current date, capacity unchecked.
    /// Reflows at most `max_tasks` tasks, earliest first.
    StudyDayOnly { max_tasks: usize },
    /// First study day after the task's current date with room, found with
    /// the slot finder. Tasks move latest first so each lands on space
    /// vacated by the tasks behind it.
    CapacityAware,
}

impl Default for ShiftMode {
    fn default() -> Self {
        ShiftMode::CapacityAware
    }
}

/// Outcome of a reflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftReport {
    /// Tasks whose date changed
    pub moved: usize,
    /// Pending tasks left in place because of the `max_tasks` bound
    pub skipped: usize,
}

impl SlotFinder {
    /// Move every pending task scheduled strictly after `from_date` to a
    /// later study day, according to `mode`.
    pub fn shift_forward<T>(
        &self,
        store: &mut T,
        user_id: &str,
        prefs: &UserPreferences,
        from_date: NaiveDate,
        mode: ShiftMode,
    ) -> Result<ShiftReport>
    where
        T: TaskStore + ?Sized,
    {
        if mode == ShiftMode::Off {
            return Ok(ShiftReport::default());
        }

        let queued: Vec<_> = store
            .list_tasks(user_id, from_date)?
            .into_iter()
            .filter(|t| t.is_pending())
            .collect();

        let mut report = ShiftReport::default();
        match mode {
            ShiftMode::Off => {}
            ShiftMode::StudyDayOnly { max_tasks } => {
                report.skipped = queued.len().saturating_sub(max_tasks);
                for task in queued.iter().take(max_tasks) {
                    let destination = self.next_study_day(prefs, task.scheduled_date)?;
                    store.update_task_date(&task.id, destination)?;
                    report.moved += 1;
                }
            }
            ShiftMode::CapacityAware => {
                for task in queued.iter().rev() {
                    let earliest = self.next_study_day(prefs, task.scheduled_date)?;
                    let destination = self.find_slot(store, user_id, prefs, earliest)?;
                    store.update_task_date(&task.id, destination)?;
                    report.moved += 1;
                }
            }
        }

        if report.skipped > 0 {
            tracing::warn!(
                user_id,
                %from_date,
                moved = report.moved,
                skipped = report.skipped,
                "shift truncated at max_tasks"
            );
        } else {
            tracing::info!(user_id, %from_date, moved = report.moved, ?mode, "shifted queued tasks");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Intensity;
    use crate::store::{InMemoryStore, StoreTx, StudyStore};
    use crate::task::{StudyTask, TaskType};
    use std::collections::BTreeMap;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn insert(tx: &mut impl TaskStore, chunk: &str, day: u32) -> String {
        tx.upsert_task(&StudyTask::new("u1", chunk, TaskType::Learn, date(day)))
            .unwrap()
    }

    fn dates_by_chunk(store: &InMemoryStore) -> BTreeMap<String, NaiveDate> {
        store
            .all_tasks()
            .unwrap()
            .into_iter()
            .map(|t| (t.chunk_id, t.scheduled_date))
            .collect()
    }

    fn load(store: &InMemoryStore) -> BTreeMap<NaiveDate, usize> {
        let mut counts = BTreeMap::new();
        for task in store.all_tasks().unwrap() {
            *counts.entry(task.scheduled_date).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn study_day_only_moves_to_next_weekday() {
        // Mon/Wed study days
        let prefs = UserPreferences::new([0u8, 2], Intensity::Light).unwrap();
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        insert(&mut tx, "today", 1);
        insert(&mut tx, "wed", 3);
        insert(&mut tx, "mon", 8);
        let report = SlotFinder::default()
            .shift_forward(&mut tx, "u1", &prefs, date(1), ShiftMode::StudyDayOnly { max_tasks: 10 })
            .unwrap();
        tx.commit().unwrap();

        assert_eq!(report, ShiftReport { moved: 2, skipped: 0 });
        let dates = dates_by_chunk(&store);
        assert_eq!(dates["today"], date(1));
        assert_eq!(dates["wed"], date(8));
        assert_eq!(dates["mon"], date(10));
    }

    #[test]
    fn study_day_only_can_overfill_and_is_bounded() {
        let prefs = UserPreferences::new([0u8, 2], Intensity::Light).unwrap();
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        insert(&mut tx, "a", 3);
        insert(&mut tx, "b", 3);
        insert(&mut tx, "c", 8);
        insert(&mut tx, "d", 8);
        insert(&mut tx, "e", 10);
        let report = SlotFinder::default()
            .shift_forward(&mut tx, "u1", &prefs, date(1), ShiftMode::StudyDayOnly { max_tasks: 3 })
            .unwrap();
        tx.commit().unwrap();

        assert_eq!(report, ShiftReport { moved: 3, skipped: 2 });
        // a, b -> Jan 8 (joining c, d which stayed): capacity is not rechecked
        assert_eq!(load(&store)[&date(8)], 3);
        let dates = dates_by_chunk(&store);
        assert_eq!(dates["d"], date(8));
        assert_eq!(dates["e"], date(10));
    }

    #[test]
    fn capacity_aware_preserves_budget() {
        let prefs = UserPreferences::new([0u8, 2], Intensity::Light).unwrap();
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        insert(&mut tx, "new", 1);
        insert(&mut tx, "a", 3);
        insert(&mut tx, "b", 3);
        insert(&mut tx, "c", 8);
        insert(&mut tx, "d", 8);
        let report = SlotFinder::default()
            .shift_forward(&mut tx, "u1", &prefs, date(1), ShiftMode::CapacityAware)
            .unwrap();
        tx.commit().unwrap();

        assert_eq!(report.moved, 4);
        let dates = dates_by_chunk(&store);
        assert_eq!(dates["a"], date(8));
        assert_eq!(dates["b"], date(8));
        assert_eq!(dates["c"], date(10));
        assert_eq!(dates["d"], date(10));
        assert!(load(&store).values().all(|&n| n <= 2));
    }

    #[test]
    fn completed_tasks_stay_put() {
        let prefs = UserPreferences::new(0u8..7, Intensity::Medium).unwrap();
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        let mut done = StudyTask::new("u1", "done", TaskType::Learn, date(5));
        done.completed = true;
        tx.upsert_task(&done).unwrap();
        insert(&mut tx, "pending", 5);
        SlotFinder::default()
            .shift_forward(&mut tx, "u1", &prefs, date(1), ShiftMode::CapacityAware)
            .unwrap();
        tx.commit().unwrap();

        let dates = dates_by_chunk(&store);
        assert_eq!(dates["done"], date(5));
        assert_eq!(dates["pending"], date(6));
    }

    #[test]
    fn off_mode_is_a_no_op() {
        let prefs = UserPreferences::default();
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        insert(&mut tx, "a", 9);
        let report = SlotFinder::default()
            .shift_forward(&mut tx, "u1", &prefs, date(1), ShiftMode::Off)
            .unwrap();
        assert_eq!(report, ShiftReport::default());
    }
}
