//! Task update engine: the exactly-once checklist status transition.
//!
//! # Responsibility
//! - Validate cross-entity preconditions against the owning visit.
//! - Enforce the "reason required" rule for skipped tasks.
//! - Compute and persist the new task state.
//!
//! # Invariants
//! - Tasks can only be updated while the owning visit is `InProgress`.
//! - A task leaves `Pending` exactly once; a lost race surfaces as
//!   `TaskAlreadyUpdated`.

use crate::model::task::{Task, TaskId, TaskStatus};
use crate::model::visit::{UserId, VisitId, VisitStatus};
use crate::repo::task_repo::TaskRepository;
use crate::repo::visit_repo::VisitRepository;
use crate::repo::RepoError;
use crate::service::ErrorKind;
use chrono::{DateTime, SubsecRound, Utc};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure of a task update.
#[derive(Debug)]
pub enum TaskServiceError {
    TaskNotFound(TaskId),
    VisitNotFound(VisitId),
    VisitNotInProgress(VisitId),
    TaskAlreadyUpdated(TaskId),
    InvalidStatus(String),
    ReasonRequired,
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::VisitNotFound(id) => write!(f, "visit not found: {id}"),
            Self::VisitNotInProgress(id) => {
                write!(f, "cannot update tasks, visit not in progress: {id}")
            }
            Self::TaskAlreadyUpdated(id) => {
                write!(f, "task already completed or marked as not completed: {id}")
            }
            Self::InvalidStatus(value) => write!(
                f,
                "invalid task status `{value}`; expected completed|not_completed"
            ),
            Self::ReasonRequired => write!(f, "reason is required for not completed tasks"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl TaskServiceError {
    /// Classification a transport layer maps onto status codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TaskNotFound(_) | Self::VisitNotFound(_) => ErrorKind::NotFound,
            Self::VisitNotInProgress(_) | Self::TaskAlreadyUpdated(_) => ErrorKind::StateConflict,
            Self::InvalidStatus(_) | Self::ReasonRequired => ErrorKind::InvalidInput,
            Self::Repo(_) => ErrorKind::PersistenceFailure,
        }
    }
}

/// Target state of a task update. `Pending` is not representable here: a
/// task never transitions back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatusUpdate {
    Completed,
    NotCompleted,
}

impl TaskStatusUpdate {
    /// Parses a caller-supplied status string.
    pub fn parse(value: &str) -> Result<Self, TaskServiceError> {
        match value {
            "completed" => Ok(Self::Completed),
            "not_completed" => Ok(Self::NotCompleted),
            other => Err(TaskServiceError::InvalidStatus(other.to_string())),
        }
    }

    fn as_status(self) -> TaskStatus {
        match self {
            Self::Completed => TaskStatus::Completed,
            Self::NotCompleted => TaskStatus::NotCompleted,
        }
    }
}

/// Public fields of an updated task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    pub visit_id: VisitId,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskView {
    pub(crate) fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            visit_id: task.visit_id,
            name: task.name.clone(),
            description: task.description.clone(),
            status: task.status,
            reason: task.reason.clone(),
            completed_at: task.completed_at,
        }
    }
}

/// Task update engine over task and visit repositories.
pub struct TaskService<T: TaskRepository, V: VisitRepository> {
    tasks: T,
    visits: V,
}

impl<T: TaskRepository, V: VisitRepository> TaskService<T, V> {
    pub fn new(tasks: T, visits: V) -> Self {
        Self { tasks, visits }
    }

    /// Resolves a pending task as completed or explicitly skipped.
    ///
    /// The owning visit must be `InProgress` (tasks cannot be touched before
    /// clock-in or after clock-out) and the task must still be `Pending`.
    /// Skipping requires a non-blank reason.
    pub fn update_task(
        &self,
        task_id: TaskId,
        user_id: UserId,
        new_status: TaskStatusUpdate,
        reason: Option<&str>,
    ) -> Result<TaskView, TaskServiceError> {
        let mut task = self
            .tasks
            .get_by_id(task_id)
            .map_err(TaskServiceError::Repo)?
            .ok_or(TaskServiceError::TaskNotFound(task_id))?;

        let visit = self
            .visits
            .get_by_id(task.visit_id, user_id)
            .map_err(TaskServiceError::Repo)?
            .ok_or(TaskServiceError::VisitNotFound(task.visit_id))?;

        if visit.status != VisitStatus::InProgress {
            return Err(TaskServiceError::VisitNotInProgress(visit.id));
        }
        if task.status != TaskStatus::Pending {
            return Err(TaskServiceError::TaskAlreadyUpdated(task_id));
        }

        task.status = new_status.as_status();
        match new_status {
            TaskStatusUpdate::Completed => {
                // Millisecond precision, matching the storage resolution.
                task.completed_at = Some(Utc::now().trunc_subsecs(3));
                task.reason = None;
            }
            TaskStatusUpdate::NotCompleted => {
                let reason = reason.map(str::trim).filter(|r| !r.is_empty());
                match reason {
                    Some(reason) => task.reason = Some(reason.to_string()),
                    None => return Err(TaskServiceError::ReasonRequired),
                }
                task.completed_at = None;
            }
        }

        match self.tasks.update_task(&task) {
            Ok(()) => {}
            // Lost race: another update resolved the task between our read
            // and write.
            Err(RepoError::PreconditionFailed { .. }) => {
                return Err(TaskServiceError::TaskAlreadyUpdated(task_id));
            }
            Err(other) => return Err(TaskServiceError::Repo(other)),
        }

        info!(
            "event=task_update module=service status=ok task_id={task_id} new_status={}",
            task.status.as_str()
        );

        Ok(TaskView::from_task(&task))
    }
}
