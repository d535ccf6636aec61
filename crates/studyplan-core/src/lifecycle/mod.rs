//! Task lifecycle state machine.
//!
//! Completion events drive each chunk through:
//!
//!   learn ──> quiz ──> review ──> [follow-up review ...] ──> terminal
//!
//! The transition out of `learn` is always an immediate quiz. What follows a
//! quiz or review depends on the [`ReviewPolicy`]:
//!
//! | completed | FixedBranch                     | ExponentialMemory              |
//! |-----------|---------------------------------|--------------------------------|
//! | quiz      | review in 3 days (1 if missed)  | review in updated interval     |
//! | review    | review in 1 day only if missed  | review in updated interval     |
//!
//! The lifecycle only decides the task type and the offset from today; slot
//! finding and shifting happen in the planner.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interval;
use crate::store::MemoryStore;
use crate::task::TaskType;

/// Review offset after a correct quiz under the fixed-branch policy.
pub const FIXED_CORRECT_OFFSET_DAYS: u32 = 3;
/// Review offset after a missed quiz or review under the fixed-branch policy.
pub const FIXED_MISSED_OFFSET_DAYS: u32 = 1;

/// System-wide rule for spacing reviews.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPolicy {
    /// 3 days after a correct quiz, 1 day after a miss; one follow-up review
    /// only after a missed review.
    #[default]
    FixedBranch,
    /// Per-chunk interval that doubles on success and resets on a miss.
    /// Reviews chain indefinitely.
    ExponentialMemory,
}

/// A completion event from the grading collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionEvent {
    pub user_id: String,
    pub chunk_id: String,
    pub task_type: TaskType,
    pub correct: bool,
}

/// Task to schedule next, relative to the completion day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NextStep {
    pub task_type: TaskType,
    pub offset_days: u32,
}

/// Decides the follow-up of each completed task.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifecycle {
    policy: ReviewPolicy,
}

impl Lifecycle {
    pub fn new(policy: ReviewPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ReviewPolicy {
        self.policy
    }

    /// Follow-up for a completed task, or `None` when the chunk is done.
    ///
    /// Under [`ReviewPolicy::ExponentialMemory`] this reads and updates the
    /// chunk's memory record, so it must run inside the same transaction as
    /// the rest of the completion.
    pub fn next_step<M>(
        &self,
        memory: &mut M,
        event: &CompletionEvent,
    ) -> Result<Option<NextStep>>
    where
        M: MemoryStore + ?Sized,
    {
        let step = match (event.task_type, self.policy) {
            (TaskType::Learn, _) => Some(NextStep {
                task_type: TaskType::Quiz,
                offset_days: 0,
            }),
            (TaskType::Quiz, ReviewPolicy::FixedBranch) => Some(NextStep {
                task_type: TaskType::Review,
                offset_days: if event.correct {
                    FIXED_CORRECT_OFFSET_DAYS
                } else {
                    FIXED_MISSED_OFFSET_DAYS
                },
            }),
            (TaskType::Review, ReviewPolicy::FixedBranch) => {
                (!event.correct).then_some(NextStep {
                    task_type: TaskType::Review,
                    offset_days: FIXED_MISSED_OFFSET_DAYS,
                })
            }
            (TaskType::Quiz | TaskType::Review, ReviewPolicy::ExponentialMemory) => {
                let offset_days = interval::update_interval(
                    memory,
                    &event.user_id,
                    &event.chunk_id,
                    event.correct,
                )?;
                Some(NextStep {
                    task_type: TaskType::Review,
                    offset_days,
                })
            }
        };
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, StudyStore};

    fn event(task_type: TaskType, correct: bool) -> CompletionEvent {
        CompletionEvent {
            user_id: "u1".into(),
            chunk_id: "c1".into(),
            task_type,
            correct,
        }
    }

    fn step(task_type: TaskType, offset_days: u32) -> Option<NextStep> {
        Some(NextStep {
            task_type,
            offset_days,
        })
    }

    #[test]
    fn learn_always_schedules_immediate_quiz() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        for policy in [ReviewPolicy::FixedBranch, ReviewPolicy::ExponentialMemory] {
            for correct in [true, false] {
                let next = Lifecycle::new(policy)
                    .next_step(&mut tx, &event(TaskType::Learn, correct))
                    .unwrap();
                assert_eq!(next, step(TaskType::Quiz, 0));
            }
        }
    }

    #[test]
    fn fixed_branch_quiz_offsets() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        let lifecycle = Lifecycle::new(ReviewPolicy::FixedBranch);
        assert_eq!(
            lifecycle.next_step(&mut tx, &event(TaskType::Quiz, true)).unwrap(),
            step(TaskType::Review, 3)
        );
        assert_eq!(
            lifecycle.next_step(&mut tx, &event(TaskType::Quiz, false)).unwrap(),
            step(TaskType::Review, 1)
        );
    }

    #[test]
    fn fixed_branch_follow_up_only_after_missed_review() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        let lifecycle = Lifecycle::new(ReviewPolicy::FixedBranch);
        assert_eq!(
            lifecycle.next_step(&mut tx, &event(TaskType::Review, false)).unwrap(),
            step(TaskType::Review, 1)
        );
        assert_eq!(
            lifecycle.next_step(&mut tx, &event(TaskType::Review, true)).unwrap(),
            None
        );
    }

    #[test]
    fn fixed_branch_leaves_memory_untouched() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        Lifecycle::new(ReviewPolicy::FixedBranch)
            .next_step(&mut tx, &event(TaskType::Quiz, true))
            .unwrap();
        assert_eq!(tx.get_interval("u1", "c1").unwrap(), None);
    }

    #[test]
    fn exponential_chain_doubles_and_resets() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        let lifecycle = Lifecycle::new(ReviewPolicy::ExponentialMemory);
        let offsets: Vec<u32> = [
            (TaskType::Quiz, true),
            (TaskType::Review, true),
            (TaskType::Review, true),
            (TaskType::Review, false),
            (TaskType::Review, true),
        ]
        .into_iter()
        .map(|(t, c)| lifecycle.next_step(&mut tx, &event(t, c)).unwrap().unwrap().offset_days)
        .collect();
        assert_eq!(offsets, vec![2, 4, 8, 1, 2]);
    }
}
