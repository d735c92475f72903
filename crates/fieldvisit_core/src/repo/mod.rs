//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for visits and tasks.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Write paths validate entities before SQL mutations; read paths reject
//!   invalid persisted state instead of masking it.
//! - Every state-changing update carries a SQL predicate re-checking its
//!   precondition; zero affected rows surfaces as `PreconditionFailed`,
//!   never as silent success.

use crate::db::DbError;
use crate::model::task::TaskValidationError;
use crate::model::visit::VisitValidationError;
use chrono::{DateTime, TimeZone, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod task_repo;
pub mod visit_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence and query error shared by the visit and task repositories.
#[derive(Debug)]
pub enum RepoError {
    VisitValidation(VisitValidationError),
    TaskValidation(TaskValidationError),
    Db(DbError),
    /// A conditional update matched no row: the precondition captured at
    /// read time no longer held at write time.
    PreconditionFailed {
        entity: &'static str,
        id: Uuid,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VisitValidation(err) => write!(f, "{err}"),
            Self::TaskValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::PreconditionFailed { entity, id } => {
                write!(f, "conditional update matched no {entity} row: {id}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::VisitValidation(err) => Some(err),
            Self::TaskValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::PreconditionFailed { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<VisitValidationError> for RepoError {
    fn from(value: VisitValidationError) -> Self {
        Self::VisitValidation(value)
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::TaskValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Converts a UTC timestamp to its epoch-millisecond storage form.
pub(crate) fn datetime_to_ms(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Parses an epoch-millisecond column back into a UTC timestamp.
pub(crate) fn datetime_from_ms(ms: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        RepoError::InvalidData(format!("invalid epoch milliseconds `{ms}` in {column}"))
    })
}

/// Parses a stored UUID column.
pub(crate) fn uuid_from_text(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
