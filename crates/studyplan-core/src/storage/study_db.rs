//! SQLite-based storage for study tasks, preferences and memory records.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Params};

use super::data_dir;
use super::migrations;
use crate::error::StoreError;
use crate::preferences::PreferenceRecord;
use crate::store::{MemoryStore, PreferenceStore, StoreResult, StoreTx, StudyStore, TaskStore};
use crate::task::{StudyTask, TaskType};

const DATE_FORMAT: &str = "%Y-%m-%d";

const TASK_COLUMNS: &str =
    "id, user_id, chunk_id, scheduled_date, task_type, completed, estimated_minutes, created_at";

// === Helper Functions ===

/// Format a calendar date for database storage
fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a calendar date from database string
fn parse_date(date_str: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|_| StoreError::Corrupt {
        field: "scheduled_date",
        value: date_str.to_string(),
    })
}

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Raw column values of one `study_tasks` row.
struct TaskRow {
    id: String,
    user_id: String,
    chunk_id: String,
    scheduled_date: String,
    task_type: String,
    completed: bool,
    estimated_minutes: u32,
    created_at: String,
}

impl TaskRow {
    fn read(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            chunk_id: row.get(2)?,
            scheduled_date: row.get(3)?,
            task_type: row.get(4)?,
            completed: row.get(5)?,
            estimated_minutes: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_task(self) -> StoreResult<StudyTask> {
        let task_type = self
            .task_type
            .parse::<TaskType>()
            .map_err(|_| StoreError::Corrupt {
                field: "task_type",
                value: self.task_type.clone(),
            })?;
        Ok(StudyTask {
            scheduled_date: parse_date(&self.scheduled_date)?,
            created_at: parse_datetime_fallback(&self.created_at),
            id: self.id,
            user_id: self.user_id,
            chunk_id: self.chunk_id,
            task_type,
            completed: self.completed,
            estimated_minutes: self.estimated_minutes,
        })
    }
}

fn query_tasks<P: Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<Vec<StudyTask>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, TaskRow::read)?;
    let mut tasks = Vec::new();
    for row in rows {
        tasks.push(row?.into_task()?);
    }
    Ok(tasks)
}

/// SQLite database for study schedule storage.
///
/// One connection behind a mutex; a [`StudyDbTx`] holds the lock and an
/// open `BEGIN IMMEDIATE` transaction.
pub struct StudyDb {
    conn: Mutex<Connection>,
}

impl StudyDb {
    /// Open the database at `~/.config/studyplan/studyplan.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> StoreResult<Self> {
        let dir = data_dir().map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Self::open_at(dir.join("studyplan.db"))
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StudyStore for StudyDb {
    type Tx<'a> = StudyDbTx<'a>;

    fn begin(&self) -> StoreResult<StudyDbTx<'_>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        Ok(StudyDbTx {
            conn,
            finished: false,
        })
    }
}

/// Open transaction on a [`StudyDb`]. Rolls back on drop unless committed.
pub struct StudyDbTx<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl Drop for StudyDbTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
                tracing::warn!(error = %err, "rollback failed");
            }
        }
    }
}

impl StoreTx for StudyDbTx<'_> {
    fn commit(mut self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        self.finished = true;
        Ok(())
    }
}

impl PreferenceStore for StudyDbTx<'_> {
    fn get_preferences(&mut self, user_id: &str) -> StoreResult<Option<PreferenceRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT study_days, intensity FROM user_preferences WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        match row {
            Some((days_json, intensity)) => {
                let study_days = serde_json::from_str(&days_json).map_err(|_| StoreError::Corrupt {
                    field: "study_days",
                    value: days_json.clone(),
                })?;
                Ok(Some(PreferenceRecord {
                    study_days,
                    intensity,
                }))
            }
            None => Ok(None),
        }
    }

    fn set_preferences(&mut self, user_id: &str, record: &PreferenceRecord) -> StoreResult<()> {
        let days_json = serde_json::to_string(&record.study_days)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO user_preferences (user_id, study_days, intensity)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                study_days = excluded.study_days,
                intensity = excluded.intensity",
            params![user_id, days_json, record.intensity],
        )?;
        Ok(())
    }
}

impl TaskStore for StudyDbTx<'_> {
    fn count_tasks(&mut self, user_id: &str, date: NaiveDate) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM study_tasks WHERE user_id = ?1 AND scheduled_date = ?2",
            params![user_id, format_date(date)],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn upsert_task(&mut self, task: &StudyTask) -> StoreResult<String> {
        self.conn.execute(
            "INSERT INTO study_tasks
                (id, user_id, chunk_id, scheduled_date, task_type, completed, estimated_minutes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                chunk_id = excluded.chunk_id,
                scheduled_date = excluded.scheduled_date,
                task_type = excluded.task_type,
                completed = excluded.completed,
                estimated_minutes = excluded.estimated_minutes",
            params![
                task.id,
                task.user_id,
                task.chunk_id,
                format_date(task.scheduled_date),
                task.task_type.as_str(),
                task.completed,
                task.estimated_minutes,
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(task.id.clone())
    }

    fn list_tasks(&mut self, user_id: &str, after: NaiveDate) -> StoreResult<Vec<StudyTask>> {
        query_tasks(
            &self.conn,
            &format!(
                "SELECT {TASK_COLUMNS} FROM study_tasks
                 WHERE user_id = ?1 AND scheduled_date > ?2
                 ORDER BY scheduled_date, rowid"
            ),
            params![user_id, format_date(after)],
        )
    }

    fn tasks_on(&mut self, user_id: &str, date: NaiveDate) -> StoreResult<Vec<StudyTask>> {
        query_tasks(
            &self.conn,
            &format!(
                "SELECT {TASK_COLUMNS} FROM study_tasks
                 WHERE user_id = ?1 AND scheduled_date = ?2
                 ORDER BY rowid"
            ),
            params![user_id, format_date(date)],
        )
    }

    fn chunk_tasks(&mut self, user_id: &str, chunk_id: &str) -> StoreResult<Vec<StudyTask>> {
        query_tasks(
            &self.conn,
            &format!(
                "SELECT {TASK_COLUMNS} FROM study_tasks
                 WHERE user_id = ?1 AND chunk_id = ?2
                 ORDER BY scheduled_date, rowid"
            ),
            params![user_id, chunk_id],
        )
    }

    fn update_task_date(&mut self, task_id: &str, date: NaiveDate) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE study_tasks SET scheduled_date = ?1 WHERE id = ?2",
            params![format_date(date), task_id],
        )?;
        if changed == 0 {
            return Err(StoreError::QueryFailed(format!("no task with id {task_id}")));
        }
        Ok(())
    }

    fn mark_completed(
        &mut self,
        user_id: &str,
        chunk_id: &str,
        task_type: TaskType,
    ) -> StoreResult<usize> {
        let changed = self.conn.execute(
            "UPDATE study_tasks SET completed = 1
             WHERE id = (
                SELECT id FROM study_tasks
                WHERE user_id = ?1 AND chunk_id = ?2 AND task_type = ?3 AND completed = 0
                ORDER BY scheduled_date, rowid
                LIMIT 1
             )",
            params![user_id, chunk_id, task_type.as_str()],
        )?;
        Ok(changed)
    }
}

impl MemoryStore for StudyDbTx<'_> {
    fn get_interval(&mut self, user_id: &str, chunk_id: &str) -> StoreResult<Option<u32>> {
        let interval = self
            .conn
            .query_row(
                "SELECT interval_days FROM memory_records WHERE user_id = ?1 AND chunk_id = ?2",
                params![user_id, chunk_id],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        Ok(interval)
    }

    fn set_interval(&mut self, user_id: &str, chunk_id: &str, interval_days: u32) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO memory_records (user_id, chunk_id, interval_days, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, chunk_id) DO UPDATE SET
                interval_days = excluded.interval_days,
                updated_at = excluded.updated_at",
            params![user_id, chunk_id, interval_days, Utc::now().to_rfc3339()],
        )?;
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
    fn create_and_count_tasks() {
        let db = StudyDb::open_memory().unwrap();
        let mut tx = db.begin().unwrap();
        tx.upsert_task(&StudyTask::new("u1", "c1", TaskType::Learn, date(1)))
            .unwrap();
        tx.upsert_task(&StudyTask::new("u1", "c2", TaskType::Learn, date(1)))
            .unwrap();
        tx.commit().unwrap();

        let mut tx = db.begin().unwrap();
        assert_eq!(tx.count_tasks("u1", date(1)).unwrap(), 2);
        assert_eq!(tx.count_tasks("u1", date(2)).unwrap(), 0);
    }

    #[test]
    fn uncommitted_writes_roll_back() {
        let db = StudyDb::open_memory().unwrap();
        {
            let mut tx = db.begin().unwrap();
            tx.upsert_task(&StudyTask::new("u1", "c1", TaskType::Learn, date(1)))
                .unwrap();
        }
        let mut tx = db.begin().unwrap();
        assert_eq!(tx.count_tasks("u1", date(1)).unwrap(), 0);
    }

    #[test]
    fn upsert_updates_in_place_and_keeps_order() {
        let db = StudyDb::open_memory().unwrap();
        let mut tx = db.begin().unwrap();
        let mut first = StudyTask::new("u1", "first", TaskType::Learn, date(2));
        tx.upsert_task(&first).unwrap();
        tx.upsert_task(&StudyTask::new("u1", "second", TaskType::Learn, date(2)))
            .unwrap();
        first.completed = true;
        tx.upsert_task(&first).unwrap();

        let tasks = tx.tasks_on("u1", date(2)).unwrap();
        let chunks: Vec<&str> = tasks.iter().map(|t| t.chunk_id.as_str()).collect();
        assert_eq!(chunks, vec!["first", "second"]);
        assert!(tasks[0].completed);
    }

    #[test]
    fn list_tasks_roundtrips_fields() {
        let db = StudyDb::open_memory().unwrap();
        let mut tx = db.begin().unwrap();
        let task = StudyTask::new("u1", "c1", TaskType::Quiz, date(5));
        tx.upsert_task(&task).unwrap();
        tx.upsert_task(&StudyTask::new("u1", "c0", TaskType::Learn, date(3)))
            .unwrap();

        let listed = tx.list_tasks("u1", date(3)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, task.id);
        assert_eq!(listed[0].task_type, TaskType::Quiz);
        assert_eq!(listed[0].scheduled_date, date(5));
        assert_eq!(listed[0].estimated_minutes, 5);
    }

    #[test]
    fn update_date_and_mark_completed() {
        let db = StudyDb::open_memory().unwrap();
        let mut tx = db.begin().unwrap();
        let task = StudyTask::new("u1", "c1", TaskType::Review, date(5));
        tx.upsert_task(&task).unwrap();
        tx.update_task_date(&task.id, date(8)).unwrap();
        assert!(tx.update_task_date("missing", date(8)).is_err());

        assert_eq!(tx.mark_completed("u1", "c1", TaskType::Review).unwrap(), 1);
        assert_eq!(tx.mark_completed("u1", "c1", TaskType::Review).unwrap(), 0);
        let history = tx.chunk_tasks("u1", "c1").unwrap();
        assert_eq!(history[0].scheduled_date, date(8));
        assert!(history[0].completed);
    }

    #[test]
    fn mark_completed_flips_only_the_earliest_match() {
        let db = StudyDb::open_memory().unwrap();
        let mut tx = db.begin().unwrap();
        let later = StudyTask::new("u1", "c1", TaskType::Quiz, date(6));
        let earlier = StudyTask::new("u1", "c1", TaskType::Quiz, date(2));
        tx.upsert_task(&later).unwrap();
        tx.upsert_task(&earlier).unwrap();

        assert_eq!(tx.mark_completed("u1", "c1", TaskType::Quiz).unwrap(), 1);
        let history = tx.chunk_tasks("u1", "c1").unwrap();
        assert_eq!(history[0].id, earlier.id);
        assert!(history[0].completed);
        assert!(history[1].is_pending());
    }

    #[test]
    fn preferences_roundtrip() {
        let db = StudyDb::open_memory().unwrap();
        let mut tx = db.begin().unwrap();
        assert!(tx.get_preferences("u1").unwrap().is_none());
        let record = PreferenceRecord {
            study_days: vec![0, 2],
            intensity: "light".into(),
        };
        tx.set_preferences("u1", &record).unwrap();
        assert_eq!(tx.get_preferences("u1").unwrap(), Some(record));
    }

    #[test]
    fn memory_records_upsert() {
        let db = StudyDb::open_memory().unwrap();
        let mut tx = db.begin().unwrap();
        assert_eq!(tx.get_interval("u1", "c1").unwrap(), None);
        tx.set_interval("u1", "c1", 2).unwrap();
        tx.set_interval("u1", "c1", 4).unwrap();
        assert_eq!(tx.get_interval("u1", "c1").unwrap(), Some(4));
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.db");
        {
            let db = StudyDb::open_at(&path).unwrap();
            let mut tx = db.begin().unwrap();
            tx.upsert_task(&StudyTask::new("u1", "c1", TaskType::Learn, date(1)))
                .unwrap();
            tx.commit().unwrap();
        }
        let db = StudyDb::open_at(&path).unwrap();
        let mut tx = db.begin().unwrap();
        assert_eq!(tx.count_tasks("u1", date(1)).unwrap(), 1);
    }

    #[test]
    fn corrupt_date_is_reported() {
        let db = StudyDb::open_memory().unwrap();
        let mut tx = db.begin().unwrap();
        tx.conn
            .execute(
                "INSERT INTO study_tasks (id, user_id, chunk_id, scheduled_date, task_type, created_at)
                 VALUES ('x', 'u1', 'c1', 'someday', 'learn', '')",
                [],
            )
            .unwrap();
        let err = tx.chunk_tasks("u1", "c1").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { field: "scheduled_date", .. }));
    }
}
