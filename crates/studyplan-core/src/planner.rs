//! Study planner facade.
//!
//! Wires the allocator, lifecycle, slot finder and shifter to an injected
//! [`StudyStore`]. Each operation runs in one store transaction; operations
//! that read day counts and then write tasks also hold a per-user lock for
//! their whole duration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};

use crate::allocator::{add_days, AllocationMode, AllocatorConfig, DayBudgetAllocator, DEFAULT_MAX_SEARCH_DAYS};
use crate::error::{Result, StoreError};
use crate::lifecycle::{CompletionEvent, Lifecycle, ReviewPolicy};
use crate::preferences::UserPreferences;
use crate::slots::{ShiftMode, SlotFinder};
use crate::store::{PreferenceStore, StoreTx, StudyStore, TaskStore};
use crate::task::{ChunkStage, StudyTask, TaskType};

/// Scheduler-wide policy choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    pub allocation_mode: AllocationMode,
    pub review_policy: ReviewPolicy,
    pub shift_mode: ShiftMode,
    /// Bound on every day-cursor search
    pub max_search_days: u32,
    /// Used when a user has no stored preferences
    pub default_preferences: UserPreferences,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            allocation_mode: AllocationMode::default(),
            review_policy: ReviewPolicy::default(),
            shift_mode: ShiftMode::default(),
            max_search_days: DEFAULT_MAX_SEARCH_DAYS,
            default_preferences: UserPreferences::default(),
        }
    }
}

/// Schedules study tasks for many users against one store.
pub struct StudyPlanner<S: StudyStore> {
    store: S,
    config: PlannerConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: StudyStore> StudyPlanner<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, PlannerConfig::default())
    }

    pub fn with_config(store: S, config: PlannerConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Run `f` inside the user's critical section.
    ///
    /// The table entry is dropped once no other caller holds or waits on it,
    /// so the table only holds users with an operation in flight.
    fn with_user_lock<T>(&self, user_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        let result = {
            let _guard = lock.lock().map_err(|_| StoreError::Poisoned)?;
            f()
        };
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
        // One reference in the table, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user_id);
        }
        result
    }

    fn slot_finder(&self) -> SlotFinder {
        SlotFinder::new(self.config.max_search_days)
    }

    /// Stored preferences, or the configured defaults if none are stored.
    /// Stored but invalid preferences are an error.
    fn load_preferences<T>(&self, tx: &mut T, user_id: &str) -> Result<UserPreferences>
    where
        T: PreferenceStore + ?Sized,
    {
        match tx.get_preferences(user_id)? {
            Some(record) => UserPreferences::from_record(&record),
            None => Ok(self.config.default_preferences),
        }
    }

    /// Place `chunk_ids` into study days starting at `start_date` (today if
    /// `None`) and persist the result.
    ///
    /// Days that already hold tasks for the user only take what fits on top
    /// of the existing load.
    ///
    /// # Errors
    /// - `InvalidPreferences` / `NoStudyDaysConfigured` for bad preferences
    /// - `CapacityExhaustedIndefinitely` when the search bound is hit
    /// - `StoreUnavailable` if any store call fails; nothing is persisted
    pub fn allocate_initial_schedule(
        &self,
        user_id: &str,
        chunk_ids: &[String],
        preferences: &UserPreferences,
        start_date: Option<NaiveDate>,
    ) -> Result<Vec<StudyTask>> {
        preferences.validate()?;
        let start = start_date.unwrap_or_else(|| Local::now().date_naive());

        self.with_user_lock(user_id, || {
            let mut tx = self.store.begin()?;

            let allocator = DayBudgetAllocator::with_config(AllocatorConfig {
                mode: self.config.allocation_mode,
                max_search_days: self.config.max_search_days,
            });
            let schedule =
                allocator.allocate_with_load(user_id, chunk_ids, start, preferences, |date| {
                    Ok(tx.count_tasks(user_id, date)?)
                })?;

            for task in &schedule {
                tx.upsert_task(task)?;
            }
            tx.commit()?;
            Ok(schedule)
        })
    }

    /// Record a completion that happened today.
    pub fn handle_task_completion(
        &self,
        user_id: &str,
        chunk_id: &str,
        task_type: TaskType,
        correct: bool,
    ) -> Result<Option<StudyTask>> {
        let today = Local::now().date_naive();
        self.handle_task_completion_on(user_id, chunk_id, task_type, correct, today)
    }

    /// Record a completion on `today` and schedule its follow-up, if any.
    ///
    /// Only the earliest pending task matching the event is completed. When
    /// the chunk already has a pending task of the follow-up type (queued by
    /// staged allocation), that task is moved to the follow-up slot instead
    /// of a second one being created, and nothing else is reflowed. A newly
    /// inserted task pushes the pending tasks behind it forward.
    ///
    /// Returns the scheduled follow-up. Returns `None` when the chunk's
    /// lifecycle is finished, or when no pending task matched the event
    /// (a redelivered event), in which case nothing is written.
    pub fn handle_task_completion_on(
        &self,
        user_id: &str,
        chunk_id: &str,
        task_type: TaskType,
        correct: bool,
        today: NaiveDate,
    ) -> Result<Option<StudyTask>> {
        self.with_user_lock(user_id, || {
            let mut tx = self.store.begin()?;

            let prefs = self.load_preferences(&mut tx, user_id)?;

            if tx.mark_completed(user_id, chunk_id, task_type)? == 0 {
                tracing::warn!(user_id, chunk_id, %task_type, "no pending task for completion, ignoring");
                return Ok(None);
            }

            let event = CompletionEvent {
                user_id: user_id.to_string(),
                chunk_id: chunk_id.to_string(),
                task_type,
                correct,
            };
            let Some(step) = Lifecycle::new(self.config.review_policy).next_step(&mut tx, &event)?
            else {
                tx.commit()?;
                tracing::info!(user_id, chunk_id, "chunk finished");
                return Ok(None);
            };

            let finder = self.slot_finder();
            let target = add_days(today, u64::from(step.offset_days))?;
            let queued = tx
                .chunk_tasks(user_id, chunk_id)?
                .into_iter()
                .find(|t| t.is_pending() && t.task_type == step.task_type);

            let (task, shifted) = match queued {
                Some(task) if task.scheduled_date == target && prefs.study_days.contains_date(target) => {
                    (task, 0)
                }
                Some(mut task) => {
                    let date = finder.find_slot(&mut tx, user_id, &prefs, target)?;
                    if date != task.scheduled_date {
                        tx.update_task_date(&task.id, date)?;
                        task.scheduled_date = date;
                    }
                    (task, 0)
                }
                None => {
                    let date = finder.find_slot(&mut tx, user_id, &prefs, target)?;
                    let task = StudyTask::new(user_id, chunk_id, step.task_type, date);
                    tx.upsert_task(&task)?;
                    let report =
                        finder.shift_forward(&mut tx, user_id, &prefs, date, self.config.shift_mode)?;
                    (task, report.moved)
                }
            };
            tx.commit()?;

            tracing::info!(
                user_id,
                chunk_id,
                next = %task.task_type,
                date = %task.scheduled_date,
                shifted,
                "scheduled follow-up"
            );
            Ok(Some(task))
        })
    }

    /// Effective preferences for a user.
    pub fn preferences(&self, user_id: &str) -> Result<UserPreferences> {
        let mut tx = self.store.begin()?;
        self.load_preferences(&mut tx, user_id)
    }

    pub fn set_preferences(&self, user_id: &str, preferences: &UserPreferences) -> Result<()> {
        preferences.validate()?;
        let mut tx = self.store.begin()?;
        tx.set_preferences(user_id, &preferences.to_record())?;
        tx.commit()?;
        Ok(())
    }

    /// Tasks scheduled on one day.
    pub fn agenda(&self, user_id: &str, date: NaiveDate) -> Result<Vec<StudyTask>> {
        let mut tx = self.store.begin()?;
        Ok(tx.tasks_on(user_id, date)?)
    }

    /// Every task ever scheduled for a chunk, ordered by date.
    pub fn chunk_history(&self, user_id: &str, chunk_id: &str) -> Result<Vec<StudyTask>> {
        let mut tx = self.store.begin()?;
        Ok(tx.chunk_tasks(user_id, chunk_id)?)
    }

    pub fn chunk_stage(&self, user_id: &str, chunk_id: &str) -> Result<ChunkStage> {
        Ok(ChunkStage::from_history(&self.chunk_history(user_id, chunk_id)?))
    }
}
