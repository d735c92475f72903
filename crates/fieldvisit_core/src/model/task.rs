//! Task domain model.
//!
//! # Responsibility
//! - Represent one checklist item belonging to a visit.
//!
//! # Invariants
//! - Status leaves `Pending` exactly once.
//! - `reason` is present iff status is `NotCompleted`.
//! - `completed_at` is present iff status is `Completed`.

use crate::model::visit::VisitId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created with the visit, not yet resolved.
    Pending,
    /// Done during the visit.
    Completed,
    /// Explicitly skipped with a reason.
    NotCompleted,
}

impl TaskStatus {
    /// Storage representation, shared by SQL and display layers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::NotCompleted => "not_completed",
        }
    }

    /// Parses the storage representation back into a status.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "not_completed" => Some(Self::NotCompleted),
            _ => None,
        }
    }
}

/// One checklist item of a visit.
///
/// `name` and `description` are immutable after creation; the task update
/// engine is the sole writer of `status`, `reason` and `completed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub visit_id: VisitId,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Invariant violation detected by `Task::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyName,
    ReasonMismatch(TaskStatus),
    CompletedAtMismatch(TaskStatus),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "task name cannot be empty"),
            Self::ReasonMismatch(status) => write!(
                f,
                "reason must be present iff status is `not_completed`, got `{}`",
                status.as_str()
            ),
            Self::CompletedAtMismatch(status) => write!(
                f,
                "completed_at must be present iff status is `completed`, got `{}`",
                status.as_str()
            ),
        }
    }
}

impl Error for TaskValidationError {}

impl Task {
    /// Creates a pending task attached to a visit.
    pub fn new(visit_id: VisitId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            visit_id,
            name: name.into(),
            description: None,
            status: TaskStatus::Pending,
            reason: None,
            completed_at: None,
        }
    }

    /// Checks the outcome-fact invariants of the task record.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.name.trim().is_empty() {
            return Err(TaskValidationError::EmptyName);
        }

        let reason_present = self
            .reason
            .as_deref()
            .is_some_and(|reason| !reason.trim().is_empty());
        if reason_present != (self.status == TaskStatus::NotCompleted) {
            return Err(TaskValidationError::ReasonMismatch(self.status));
        }

        if self.completed_at.is_some() != (self.status == TaskStatus::Completed) {
            return Err(TaskValidationError::CompletedAtMismatch(self.status));
        }

        Ok(())
    }

    /// Returns whether the task has not been resolved yet.
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Returns whether an update may be attempted.
    pub fn can_update(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskStatus, TaskValidationError};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn pending_task_is_valid() {
        let task = Task::new(Uuid::new_v4(), "Check medication");
        task.validate().unwrap();
        assert!(task.is_pending());
        assert!(task.can_update());
    }

    #[test]
    fn completed_requires_timestamp_and_no_reason() {
        let mut task = Task::new(Uuid::new_v4(), "Check medication");
        task.status = TaskStatus::Completed;
        assert_eq!(
            task.validate(),
            Err(TaskValidationError::CompletedAtMismatch(
                TaskStatus::Completed
            ))
        );

        task.completed_at = Some(Utc::now());
        task.validate().unwrap();

        task.reason = Some("left early".to_string());
        assert_eq!(
            task.validate(),
            Err(TaskValidationError::ReasonMismatch(TaskStatus::Completed))
        );
    }

    #[test]
    fn not_completed_requires_non_blank_reason() {
        let mut task = Task::new(Uuid::new_v4(), "Check medication");
        task.status = TaskStatus::NotCompleted;
        assert_eq!(
            task.validate(),
            Err(TaskValidationError::ReasonMismatch(
                TaskStatus::NotCompleted
            ))
        );

        task.reason = Some("   ".to_string());
        assert!(task.validate().is_err());

        task.reason = Some("client unavailable".to_string());
        task.validate().unwrap();
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Completed,
            TaskStatus::NotCompleted,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("skipped"), None);
    }
}
