//! Day-budget allocator.
//!
//! Streams chunk identifiers into calendar days:
//! - a single day cursor starts at `start_date` and only moves forward
//! - a day accepts a task if its weekday is a study day and one more task
//!   still fits in the daily budget
//! - placed tasks are buffered per date and flattened in date order, so
//!   tasks sharing a date keep the order they were placed in
//!
//! In [`AllocationMode::Staged`] each chunk expands into learn, quiz and
//! review tasks and the cursor advances by the spacing after every placed
//! task, so later chunks start after earlier chunks' stages.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};
use crate::preferences::UserPreferences;
use crate::task::{StudyTask, TaskType};

/// Default cap on how many days the cursor may advance without placing.
pub const DEFAULT_MAX_SEARCH_DAYS: u32 = 730;

/// Which tasks the allocator emits per chunk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum AllocationMode {
    /// One `learn` task per chunk
    LearnOnly,
    /// `learn`, `quiz`, `review` per chunk, `spacing_days` apart
    Staged { spacing_days: u32 },
}

impl AllocationMode {
    pub fn staged() -> Self {
        AllocationMode::Staged { spacing_days: 1 }
    }

    fn stages(self) -> &'static [TaskType] {
        match self {
            AllocationMode::LearnOnly => &TaskType::STAGES[..1],
            AllocationMode::Staged { .. } => &TaskType::STAGES,
        }
    }

    fn spacing_days(self) -> u32 {
        match self {
            AllocationMode::LearnOnly => 0,
            AllocationMode::Staged { spacing_days } => spacing_days,
        }
    }
}

impl Default for AllocationMode {
    fn default() -> Self {
        AllocationMode::LearnOnly
    }
}

/// Allocator configuration
#[derive(Debug, Clone, Copy)]
pub struct AllocatorConfig {
    pub mode: AllocationMode,
    /// Days the cursor may advance without placing before giving up
    pub max_search_days: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            mode: AllocationMode::default(),
            max_search_days: DEFAULT_MAX_SEARCH_DAYS,
        }
    }
}

/// Streams chunks into capacity-respecting study days.
#[derive(Debug, Clone, Default)]
pub struct DayBudgetAllocator {
    config: AllocatorConfig,
}

impl DayBudgetAllocator {
    /// Create an allocator with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: AllocatorConfig) -> Self {
        Self { config }
    }

    pub fn mode(&self) -> AllocationMode {
        self.config.mode
    }

    /// Allocate onto an empty calendar.
    pub fn allocate(
        &self,
        user_id: &str,
        chunk_ids: &[String],
        start_date: NaiveDate,
        prefs: &UserPreferences,
    ) -> Result<Vec<StudyTask>> {
        self.allocate_with_load(user_id, chunk_ids, start_date, prefs, |_| Ok(0))
    }

    /// Allocate on top of an existing per-day load.
    ///
    /// `existing_load(date)` returns how many tasks are already scheduled on
    /// `date`; it is queried at most once per date.
    ///
    /// # Errors
    /// - `NoStudyDaysConfigured` if `prefs` has no study days
    /// - `CapacityExhaustedIndefinitely` if the cursor advances more than
    ///   `max_search_days` without placing a task
    /// - whatever `existing_load` returns
    pub fn allocate_with_load<F>(
        &self,
        user_id: &str,
        chunk_ids: &[String],
        start_date: NaiveDate,
        prefs: &UserPreferences,
        mut existing_load: F,
    ) -> Result<Vec<StudyTask>>
    where
        F: FnMut(NaiveDate) -> Result<usize>,
    {
        if prefs.study_days.is_empty() {
            return Err(SchedulingError::NoStudyDaysConfigured);
        }

        let spacing = u64::from(self.config.mode.spacing_days());
        let mut cursor = start_date;
        let mut existing: HashMap<NaiveDate, usize> = HashMap::new();
        let mut buffer: BTreeMap<NaiveDate, Vec<StudyTask>> = BTreeMap::new();

        for chunk_id in chunk_ids {
            for &task_type in self.config.mode.stages() {
                let search_start = cursor;
                let mut searched = 0u32;
                loop {
                    if prefs.study_days.contains_date(cursor) {
                        let prior = match existing.get(&cursor) {
                            Some(count) => *count,
                            None => {
                                let count = existing_load(cursor)?;
                                existing.insert(cursor, count);
                                count
                            }
                        };
                        let buffered = buffer.get(&cursor).map_or(0, Vec::len);
                        if prefs.has_room_for_one_more(prior + buffered) {
                            break;
                        }
                    }
                    if searched >= self.config.max_search_days {
                        return Err(SchedulingError::CapacityExhaustedIndefinitely {
                            start: search_start,
                            searched_days: searched,
                        });
                    }
                    cursor = add_days(cursor, 1)?;
                    searched += 1;
                }

                tracing::debug!(user_id, chunk_id = %chunk_id, %task_type, date = %cursor, "placed");
                buffer
                    .entry(cursor)
                    .or_default()
                    .push(StudyTask::new(user_id, chunk_id.as_str(), task_type, cursor));

                if spacing > 0 {
                    cursor = add_days(cursor, spacing)?;
                }
            }
        }

        let schedule: Vec<StudyTask> = buffer.into_values().flatten().collect();
        tracing::info!(
            user_id,
            chunks = chunk_ids.len(),
            tasks = schedule.len(),
            mode = ?self.config.mode,
            "allocated schedule"
        );
        Ok(schedule)
    }
}

pub(crate) fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or(SchedulingError::DateOutOfRange { from: date, days })
}
