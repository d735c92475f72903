//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Fetch tasks by identity and list them per visit.
//! - Persist the exactly-once status transition behind a conditional update.
//!
//! # Invariants
//! - `update_task` writes only rows whose status is still `pending` and
//!   returns `PreconditionFailed` when the guard matched no row.

use crate::model::task::{Task, TaskId, TaskStatus};
use crate::model::visit::VisitId;
use crate::repo::{datetime_from_ms, datetime_to_ms, uuid_from_text, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    visit_id,
    name,
    description,
    status,
    reason,
    completed_at
FROM tasks";

/// Repository interface for task reads and outcome writes.
///
/// `create_task` exists for the external scheduling process (and tests);
/// the update engine never creates tasks.
pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    fn get_by_id(&self, task_id: TaskId) -> RepoResult<Option<Task>>;
    fn list_for_visit(&self, visit_id: VisitId) -> RepoResult<Vec<Task>>;
    fn update_task(&self, task: &Task) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (id, visit_id, name, description, status, reason, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                task.id.to_string(),
                task.visit_id.to_string(),
                task.name.as_str(),
                task.description.as_deref(),
                task.status.as_str(),
                task.reason.as_deref(),
                task.completed_at.map(datetime_to_ms),
            ],
        )?;

        Ok(task.id)
    }

    fn get_by_id(&self, task_id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query(params![task_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }

        Ok(None)
    }

    fn list_for_visit(&self, visit_id: VisitId) -> RepoResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE visit_id = ?1 ORDER BY id ASC;"))?;

        let mut rows = stmt.query(params![visit_id.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        Ok(tasks)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                status = ?1,
                reason = ?2,
                completed_at = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4 AND status = 'pending';",
            params![
                task.status.as_str(),
                task.reason.as_deref(),
                task.completed_at.map(datetime_to_ms),
                task.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::PreconditionFailed {
                entity: "task",
                id: task.id,
            });
        }

        Ok(())
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id = uuid_from_text(&row.get::<_, String>("id")?, "tasks.id")?;
    let visit_id = uuid_from_text(&row.get::<_, String>("visit_id")?, "tasks.visit_id")?;

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;

    let completed_at = match row.get::<_, Option<i64>>("completed_at")? {
        Some(ms) => Some(datetime_from_ms(ms, "tasks.completed_at")?),
        None => None,
    };

    let task = Task {
        id,
        visit_id,
        name: row.get("name")?,
        description: row.get("description")?,
        status,
        reason: row.get("reason")?,
        completed_at,
    };
    task.validate()?;
    Ok(task)
}
