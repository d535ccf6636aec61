//! # Studyplan Core Library
//!
//! This library provides the scheduling engine for spaced study plans: it turns
//! a list of content chunks into a calendar of learn, quiz and review tasks and
//! keeps that calendar consistent as completions arrive. All operations are
//! available via the standalone `studyplan` CLI binary built on this crate.
//!
//! ## Architecture
//!
//! - **Allocator**: Streams chunks into study days under a daily minute budget
//! - **Lifecycle**: Decides the follow-up task of each completion under a
//!   swappable review policy
//! - **Slots**: Finds the next day with room and reflows queued tasks
//! - **Store**: Transactional store traits, with SQLite and in-memory backends
//!
//! ## Key Components
//!
//! - [`StudyPlanner`]: Facade running each operation in one transaction
//! - [`DayBudgetAllocator`]: Initial schedule placement
//! - [`StudyDb`]: SQLite persistence
//! - [`Config`]: TOML configuration

pub mod allocator;
pub mod error;
pub mod interval;
pub mod lifecycle;
pub mod planner;
pub mod preferences;
pub mod slots;
pub mod storage;
pub mod store;
pub mod task;

pub use allocator::{AllocationMode, AllocatorConfig, DayBudgetAllocator};
pub use error::{ConfigError, SchedulingError, StoreError};
pub use lifecycle::{CompletionEvent, Lifecycle, NextStep, ReviewPolicy};
pub use planner::{PlannerConfig, StudyPlanner};
pub use preferences::{Intensity, StudyDays, UserPreferences};
pub use slots::{ShiftMode, ShiftReport, SlotFinder};
pub use storage::{Config, StudyDb};
pub use store::{InMemoryStore, StoreTx, StudyStore};
pub use task::{ChunkStage, StudyTask, TaskType};
