//! Core domain logic for FieldVisit: attendance compliance and
//! state-transition rules for field-service visits.
//! This crate is the single source of truth for business invariants.

pub mod compliance;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod util;

pub use compliance::{
    evaluate_location, ComplianceResult, ComplianceTier, FLAG_LOCATION_ERROR,
    FLAG_LOCATION_WARNING,
};
pub use config::{ConfigError, ConfigResult, ServiceConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::geo::{GeoObservation, GeoValidationError};
pub use model::task::{Task, TaskId, TaskStatus, TaskValidationError};
pub use model::visit::{UserId, Visit, VisitId, VisitStatus, VisitValidationError};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::visit_repo::{SqliteVisitRepository, VisitListQuery, VisitRepository};
pub use repo::{RepoError, RepoResult};
pub use service::task_service::{TaskService, TaskServiceError, TaskStatusUpdate, TaskView};
pub use service::visit_service::{
    ClockInOutcome, ClockOutOutcome, VisitDetails, VisitList, VisitService, VisitServiceError,
    VisitStats, VisitSummary,
};
pub use service::ErrorKind;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
