//! Domain model for field-service visits and their checklist tasks.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep "present or absent" optional facts explicit via `Option`, never
//!   sentinel zero values.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - Visit status is a strict function of its clock facts.
//! - Task outcome facts (`reason`, `completed_at`) exist iff the matching
//!   status is set.

pub mod geo;
pub mod task;
pub mod visit;
