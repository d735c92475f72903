//! Visit domain model.
//!
//! # Responsibility
//! - Represent one scheduled appointment with lifecycle status, schedule
//!   window, optional clock facts and compliance metadata.
//! - Provide lifecycle predicates used by the session engine.
//!
//! # Invariants
//! - `clock_out_time` is present only when `clock_in_time` is present, and is
//!   never earlier than it.
//! - Clock coordinates are present iff the matching clock timestamp is.
//! - `status` is a strict function of the clock facts (see `validate`).
//! - `validation_notes` is present only when a compliance flag was raised.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a visit.
pub type VisitId = Uuid;

/// Identity of the actor a visit is assigned to.
///
/// There is no authentication layer yet; callers thread an explicit actor
/// identity through every operation so a real one can be substituted later.
pub type UserId = Uuid;

/// Visit lifecycle state.
///
/// Transitions only move forward: `Scheduled -> InProgress -> Completed`,
/// with `Cancelled` reachable from `Scheduled` by an external scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl VisitStatus {
    /// Storage representation, shared by SQL and display layers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the storage representation back into a status.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// One scheduled appointment a worker must attend.
///
/// Scheduling facts (`client_name` through `end_time`) are written once by an
/// external creation process; the visit session engine is the only writer of
/// clock facts, status and compliance metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub user_id: UserId,
    pub client_name: String,
    pub service_name: String,
    pub service_notes: Option<String>,
    /// Display address of the scheduled location.
    pub location: String,
    /// Reference geolocation the geofence is anchored to.
    pub latitude: f64,
    pub longitude: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: VisitStatus,
    pub clock_in_time: Option<DateTime<Utc>>,
    pub clock_in_latitude: Option<f64>,
    pub clock_in_longitude: Option<f64>,
    pub clock_out_time: Option<DateTime<Utc>>,
    pub clock_out_latitude: Option<f64>,
    pub clock_out_longitude: Option<f64>,
    /// Compliance tier tags recorded at clock-in, in raise order.
    pub compliance_flags: Vec<String>,
    /// Diagnostic text, present only when a flag was raised.
    pub validation_notes: Option<String>,
}

/// Invariant violation detected by `Visit::validate`.
#[derive(Debug, Clone, PartialEq)]
pub enum VisitValidationError {
    ReferenceOutOfRange { latitude: f64, longitude: f64 },
    WindowInverted,
    ClockOutWithoutClockIn,
    ClockOutBeforeClockIn,
    ClockCoordinatesIncomplete(&'static str),
    StatusOutOfSyncWithClockFacts(VisitStatus),
    NotesWithoutFlags,
}

impl Display for VisitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReferenceOutOfRange {
                latitude,
                longitude,
            } => write!(
                f,
                "reference coordinates out of range: ({latitude}, {longitude})"
            ),
            Self::WindowInverted => write!(f, "scheduled end precedes scheduled start"),
            Self::ClockOutWithoutClockIn => write!(f, "clock-out recorded without clock-in"),
            Self::ClockOutBeforeClockIn => write!(f, "clock-out precedes clock-in"),
            Self::ClockCoordinatesIncomplete(which) => {
                write!(f, "{which} coordinates incomplete for recorded timestamp")
            }
            Self::StatusOutOfSyncWithClockFacts(status) => write!(
                f,
                "status `{}` does not match recorded clock facts",
                status.as_str()
            ),
            Self::NotesWithoutFlags => {
                write!(f, "validation notes present without a compliance flag")
            }
        }
    }
}

impl Error for VisitValidationError {}

impl Visit {
    /// Creates a freshly scheduled visit with no clock facts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        client_name: impl Into<String>,
        service_name: impl Into<String>,
        location: impl Into<String>,
        latitude: f64,
        longitude: f64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            client_name: client_name.into(),
            service_name: service_name.into(),
            service_notes: None,
            location: location.into(),
            latitude,
            longitude,
            start_time,
            end_time,
            status: VisitStatus::Scheduled,
            clock_in_time: None,
            clock_in_latitude: None,
            clock_in_longitude: None,
            clock_out_time: None,
            clock_out_latitude: None,
            clock_out_longitude: None,
            compliance_flags: Vec::new(),
            validation_notes: None,
        }
    }

    /// Checks every cross-field invariant of the visit record.
    ///
    /// Repositories call this before every write and after every read, so a
    /// status can never be persisted out of sync with the clock facts that
    /// produced it.
    pub fn validate(&self) -> Result<(), VisitValidationError> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(VisitValidationError::ReferenceOutOfRange {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }

        if self.end_time < self.start_time {
            return Err(VisitValidationError::WindowInverted);
        }

        if self.clock_in_time.is_some() != self.clock_in_latitude.is_some()
            || self.clock_in_time.is_some() != self.clock_in_longitude.is_some()
        {
            return Err(VisitValidationError::ClockCoordinatesIncomplete("clock-in"));
        }
        if self.clock_out_time.is_some() != self.clock_out_latitude.is_some()
            || self.clock_out_time.is_some() != self.clock_out_longitude.is_some()
        {
            return Err(VisitValidationError::ClockCoordinatesIncomplete(
                "clock-out",
            ));
        }

        match (self.clock_in_time, self.clock_out_time) {
            (None, Some(_)) => return Err(VisitValidationError::ClockOutWithoutClockIn),
            (Some(clock_in), Some(clock_out)) if clock_out < clock_in => {
                return Err(VisitValidationError::ClockOutBeforeClockIn);
            }
            _ => {}
        }

        let status_consistent = match (self.clock_in_time, self.clock_out_time) {
            (None, _) => matches!(self.status, VisitStatus::Scheduled | VisitStatus::Cancelled),
            (Some(_), None) => self.status == VisitStatus::InProgress,
            (Some(_), Some(_)) => self.status == VisitStatus::Completed,
        };
        if !status_consistent {
            return Err(VisitValidationError::StatusOutOfSyncWithClockFacts(
                self.status,
            ));
        }

        if self.validation_notes.is_some() && self.compliance_flags.is_empty() {
            return Err(VisitValidationError::NotesWithoutFlags);
        }

        Ok(())
    }

    /// Returns whether the visit still expects worker activity.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            VisitStatus::Scheduled | VisitStatus::InProgress
        )
    }

    /// Returns whether a clock-in may be attempted.
    pub fn can_start(&self) -> bool {
        self.status == VisitStatus::Scheduled
    }

    /// Returns whether a clock-out may be attempted.
    pub fn can_end(&self) -> bool {
        self.status == VisitStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::{Visit, VisitStatus, VisitValidationError};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn scheduled_visit() -> Visit {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        Visit::new(
            Uuid::new_v4(),
            "Acme Care",
            "Home check",
            "12 Main St",
            1.0,
            1.0,
            start,
            start + Duration::hours(1),
        )
    }

    #[test]
    fn fresh_visit_is_valid_and_startable() {
        let visit = scheduled_visit();
        visit.validate().unwrap();
        assert!(visit.can_start());
        assert!(!visit.can_end());
        assert!(visit.is_active());
    }

    #[test]
    fn clock_out_without_clock_in_is_rejected() {
        let mut visit = scheduled_visit();
        visit.clock_out_time = Some(visit.start_time);
        visit.clock_out_latitude = Some(1.0);
        visit.clock_out_longitude = Some(1.0);
        visit.status = VisitStatus::Completed;
        assert_eq!(
            visit.validate(),
            Err(VisitValidationError::ClockOutWithoutClockIn)
        );
    }

    #[test]
    fn clock_out_before_clock_in_is_rejected() {
        let mut visit = scheduled_visit();
        visit.clock_in_time = Some(visit.start_time);
        visit.clock_in_latitude = Some(1.0);
        visit.clock_in_longitude = Some(1.0);
        visit.clock_out_time = Some(visit.start_time - Duration::minutes(1));
        visit.clock_out_latitude = Some(1.0);
        visit.clock_out_longitude = Some(1.0);
        visit.status = VisitStatus::Completed;
        assert_eq!(
            visit.validate(),
            Err(VisitValidationError::ClockOutBeforeClockIn)
        );
    }

    #[test]
    fn status_must_match_clock_facts() {
        let mut visit = scheduled_visit();
        visit.status = VisitStatus::InProgress;
        assert_eq!(
            visit.validate(),
            Err(VisitValidationError::StatusOutOfSyncWithClockFacts(
                VisitStatus::InProgress
            ))
        );

        visit.clock_in_time = Some(visit.start_time);
        visit.clock_in_latitude = Some(1.0);
        visit.clock_in_longitude = Some(1.0);
        visit.validate().unwrap();
        assert!(visit.can_end());
    }

    #[test]
    fn notes_require_a_flag() {
        let mut visit = scheduled_visit();
        visit.validation_notes = Some("too far".to_string());
        assert_eq!(visit.validate(), Err(VisitValidationError::NotesWithoutFlags));

        visit.compliance_flags = vec!["LOCATION_WARNING".to_string()];
        visit.validate().unwrap();
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            VisitStatus::Scheduled,
            VisitStatus::InProgress,
            VisitStatus::Completed,
            VisitStatus::Cancelled,
        ] {
            assert_eq!(VisitStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VisitStatus::parse("paused"), None);
    }
}
