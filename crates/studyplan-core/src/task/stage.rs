//! Per-chunk learning stage, derived from task history.
//!
//!   LearnPending ──> QuizPending ──> ReviewPending ──> Terminal
//!                                      ^      |
//!                                      +------+  (follow-up review)
//!
//! A chunk's stage is never stored; it is recomputed from the tasks that
//! reference it, so it always agrees with the persisted schedule.

use serde::{Deserialize, Serialize};

use super::{StudyTask, TaskType};

/// Where a chunk sits in the learn → quiz → review progression.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStage {
    /// No task references the chunk
    Unscheduled,
    LearnPending,
    QuizPending,
    ReviewPending,
    /// Every task is completed and nothing further is queued
    Terminal,
}

impl ChunkStage {
    /// Derive the stage from all tasks of one chunk (any order).
    ///
    /// The earliest pending task decides the stage; with nothing pending the
    /// chunk is terminal.
    pub fn from_history(tasks: &[StudyTask]) -> Self {
        if tasks.is_empty() {
            return ChunkStage::Unscheduled;
        }
        let next_pending = tasks
            .iter()
            .filter(|t| t.is_pending())
            .min_by_key(|t| (t.scheduled_date, t.task_type));
        match next_pending.map(|t| t.task_type) {
            Some(TaskType::Learn) => ChunkStage::LearnPending,
            Some(TaskType::Quiz) => ChunkStage::QuizPending,
            Some(TaskType::Review) => ChunkStage::ReviewPending,
            None => ChunkStage::Terminal,
        }
    }

    /// Task type whose completion moves this stage forward.
    pub fn awaiting(self) -> Option<TaskType> {
        match self {
            ChunkStage::LearnPending => Some(TaskType::Learn),
            ChunkStage::QuizPending => Some(TaskType::Quiz),
            ChunkStage::ReviewPending => Some(TaskType::Review),
            ChunkStage::Unscheduled | ChunkStage::Terminal => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ChunkStage::Terminal
    }
}
