//! Slot finding and schedule shifting against the persisted task table.
//!
//! [`SlotFinder::find_slot`] turns a target date into the first study day on
//! or after it that still has room. [`SlotFinder::shift_forward`] reflows the
//! tasks queued after an insertion point.

mod shift;

use chrono::NaiveDate;

pub use shift::{ShiftMode, ShiftReport};

use crate::allocator::{add_days, DEFAULT_MAX_SEARCH_DAYS};
use crate::error::{Result, SchedulingError};
use crate::preferences::UserPreferences;
use crate::store::TaskStore;

/// Finds capacity-respecting dates and reflows future tasks.
#[derive(Debug, Clone, Copy)]
pub struct SlotFinder {
    max_search_days: u32,
}

impl Default for SlotFinder {
    fn default() -> Self {
        Self {
            max_search_days: DEFAULT_MAX_SEARCH_DAYS,
        }
    }
}

impl SlotFinder {
    pub fn new(max_search_days: u32) -> Self {
        Self { max_search_days }
    }

    /// First study day on or after `start` whose stored task count leaves
    /// room for one more task.
    ///
    /// Reads only; calling it twice without intervening writes returns the
    /// same date.
    pub fn find_slot<T>(
        &self,
        store: &mut T,
        user_id: &str,
        prefs: &UserPreferences,
        start: NaiveDate,
    ) -> Result<NaiveDate>
    where
        T: TaskStore + ?Sized,
    {
        if prefs.study_days.is_empty() {
            return Err(SchedulingError::NoStudyDaysConfigured);
        }

        let mut candidate = start;
        for searched in 0..=self.max_search_days {
            if prefs.study_days.contains_date(candidate) {
                let load = store.count_tasks(user_id, candidate)?;
                if prefs.has_room_for_one_more(load) {
                    tracing::debug!(user_id, %start, slot = %candidate, load, "slot found");
                    return Ok(candidate);
                }
            }
            if searched < self.max_search_days {
                candidate = add_days(candidate, 1)?;
            }
        }

        Err(SchedulingError::CapacityExhaustedIndefinitely {
            start,
            searched_days: self.max_search_days,
        })
    }

    /// Next study weekday strictly after `date`, ignoring capacity.
    fn next_study_day(&self, prefs: &UserPreferences, date: NaiveDate) -> Result<NaiveDate> {
        if prefs.study_days.is_empty() {
            return Err(SchedulingError::NoStudyDaysConfigured);
        }
        let mut candidate = add_days(date, 1)?;
        // At most six non-study days in a row when at least one weekday is set.
        while !prefs.study_days.contains_date(candidate) {
            candidate = add_days(candidate, 1)?;
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Intensity;
    use crate::store::{InMemoryStore, StoreTx, StudyStore};
    use crate::task::{StudyTask, TaskType};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn seed(store: &InMemoryStore, day: u32, n: usize) {
        let mut tx = store.begin().unwrap();
        for i in 0..n {
            tx.upsert_task(&StudyTask::new("u1", format!("c{day}-{i}"), TaskType::Learn, date(day)))
                .unwrap();
        }
        tx.commit().unwrap();
    }

    #[test]
    fn empty_day_is_accepted() {
        let store = InMemoryStore::new();
        let prefs = UserPreferences::new([0u8, 2], Intensity::Light).unwrap();
        let mut tx = store.begin().unwrap();
        let slot = SlotFinder::default()
            .find_slot(&mut tx, "u1", &prefs, date(1))
            .unwrap();
        assert_eq!(slot, date(1));
    }

    #[test]
    fn full_and_off_days_are_skipped() {
        let store = InMemoryStore::new();
        seed(&store, 1, 2);
        let prefs = UserPreferences::new([0u8, 2], Intensity::Light).unwrap();
        let mut tx = store.begin().unwrap();
        let slot = SlotFinder::default()
            .find_slot(&mut tx, "u1", &prefs, date(1))
            .unwrap();
        assert_eq!(slot, date(3));
    }

    #[test]
    fn other_users_do_not_consume_capacity() {
        let store = InMemoryStore::new();
        seed(&store, 1, 2);
        let prefs = UserPreferences::new([0u8], Intensity::Light).unwrap();
        let mut tx = store.begin().unwrap();
        let slot = SlotFinder::default()
            .find_slot(&mut tx, "u2", &prefs, date(1))
            .unwrap();
        assert_eq!(slot, date(1));
    }

    #[test]
    fn find_slot_is_idempotent() {
        let store = InMemoryStore::new();
        seed(&store, 1, 2);
        seed(&store, 3, 1);
        let prefs = UserPreferences::new([0u8, 2], Intensity::Light).unwrap();
        let finder = SlotFinder::default();
        let mut tx = store.begin().unwrap();
        let first = finder.find_slot(&mut tx, "u1", &prefs, date(1)).unwrap();
        let second = finder.find_slot(&mut tx, "u1", &prefs, date(1)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, date(3));
    }

    #[test]
    fn exhausted_horizon_is_reported() {
        let store = InMemoryStore::new();
        for day in 1..=31 {
            seed(&store, day, 2);
        }
        let prefs = UserPreferences::new(0u8..7, Intensity::Light).unwrap();
        let mut tx = store.begin().unwrap();
        let err = SlotFinder::new(20)
            .find_slot(&mut tx, "u1", &prefs, date(1))
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::CapacityExhaustedIndefinitely { searched_days: 20, .. }
        ));
    }

    #[test]
    fn next_study_day_wraps_the_week() {
        let prefs = UserPreferences::new([0u8], Intensity::Light).unwrap();
        let next = SlotFinder::default().next_study_day(&prefs, date(1)).unwrap();
        assert_eq!(next, date(8));
    }
}
