//! Core use-case services: the visit session engine and the task update
//! engine.
//!
//! # Responsibility
//! - Orchestrate repository calls into attendance use-cases.
//! - Keep transport layers decoupled from storage and validation details.
//!
//! # Invariants
//! - Engines are stateless between calls; all durable state lives behind the
//!   repository traits.
//! - A policy or state-conflict rejection never mutates persisted state.

use serde::Serialize;

pub mod task_service;
pub mod visit_service;

/// Transport-facing classification of a service failure.
///
/// A boundary layer is expected to map `NotFound` to 404, `StateConflict`
/// to 409, `InvalidInput` and `PolicyViolation` to 400, and
/// `PersistenceFailure` to 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Entity absent or not owned by the acting user.
    NotFound,
    /// Malformed input: bad coordinates, unknown status, missing reason.
    InvalidInput,
    /// Operation attempted against an entity not in the required state.
    StateConflict,
    /// Time-window or distance threshold breached.
    PolicyViolation,
    /// The repository could not complete the read or write.
    PersistenceFailure,
}
