//! Study task types.
//!
//! A [`StudyTask`] is one row of persisted schedule state: a chunk to
//! learn, quiz or review on a given calendar day. Tasks are never deleted;
//! completed ones stay behind as history.

pub mod stage;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use stage::ChunkStage;

/// Fixed time cost of every task, in minutes.
pub const ESTIMATED_MINUTES: u32 = 5;

/// Kind of study activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// First pass over the chunk
    Learn,
    /// Graded recall check after learning
    Quiz,
    /// Spaced repetition pass
    Review,
}

impl TaskType {
    /// In-order life stages a chunk goes through.
    pub const STAGES: [TaskType; 3] = [TaskType::Learn, TaskType::Quiz, TaskType::Review];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Learn => "learn",
            TaskType::Quiz => "quiz",
            TaskType::Review => "review",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown task type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTaskType(pub String);

impl fmt::Display for UnknownTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown task type '{}' (expected learn, quiz or review)", self.0)
    }
}

impl std::error::Error for UnknownTaskType {}

impl FromStr for TaskType {
    type Err = UnknownTaskType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learn" => Ok(TaskType::Learn),
            "quiz" => Ok(TaskType::Quiz),
            "review" => Ok(TaskType::Review),
            other => Err(UnknownTaskType(other.to_string())),
        }
    }
}

/// One scheduled study activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudyTask {
    /// Unique identifier, used as the upsert key
    pub id: String,
    pub user_id: String,
    /// Opaque reference to a content unit
    pub chunk_id: String,
    pub scheduled_date: NaiveDate,
    pub task_type: TaskType,
    pub completed: bool,
    pub estimated_minutes: u32,
    pub created_at: DateTime<Utc>,
}

impl StudyTask {
    /// Create a pending task with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        chunk_id: impl Into<String>,
        task_type: TaskType,
        scheduled_date: NaiveDate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            chunk_id: chunk_id.into(),
            scheduled_date,
            task_type,
            completed: false,
            estimated_minutes: ESTIMATED_MINUTES,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_pending_with_fixed_cost() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let task = StudyTask::new("u1", "c1", TaskType::Learn, date);
        assert!(task.is_pending());
        assert_eq!(task.estimated_minutes, 5);
        assert_eq!(task.scheduled_date, date);
        assert!(!task.id.is_empty());
    }

    #[test]
    fn task_ids_are_unique() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let a = StudyTask::new("u1", "c1", TaskType::Review, date);
        let b = StudyTask::new("u1", "c1", TaskType::Review, date);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn task_type_parsing() {
        assert_eq!("quiz".parse::<TaskType>().unwrap(), TaskType::Quiz);
        assert!("exam".parse::<TaskType>().is_err());
        assert_eq!(TaskType::Review.to_string(), "review");
    }

    #[test]
    fn task_serialization() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let task = StudyTask::new("u1", "c1", TaskType::Quiz, date);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["task_type"], "quiz");
        assert_eq!(json["scheduled_date"], "2024-03-04");
        let decoded: StudyTask = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, task);
    }
}
