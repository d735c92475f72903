//! Visit session engine: clock-in/clock-out orchestration and visit queries.
//!
//! # Responsibility
//! - Validate clock-in preconditions (idempotency guard, time window,
//!   geofence compliance) and compute the `Scheduled -> InProgress`
//!   transition.
//! - Validate clock-out preconditions (started, not ended, minimum duration)
//!   and compute the `InProgress -> Completed` transition.
//! - Shape caller-facing list/detail views of visits.
//!
//! # Invariants
//! - A rejected operation leaves the visit untouched; clock facts are
//!   written only after every precondition has passed.
//! - Writes go through conditional repository updates; a lost race surfaces
//!   as the matching state conflict, never as success.
//! - Clock-out performs no geofence re-check (product decision under review;
//!   do not add one silently).

use crate::compliance::{evaluate_location, ComplianceTier};
use crate::config::ServiceConfig;
use crate::model::geo::GeoObservation;
use crate::model::task::Task;
use crate::model::visit::{UserId, Visit, VisitId, VisitStatus};
use crate::repo::task_repo::TaskRepository;
use crate::repo::visit_repo::{VisitListQuery, VisitRepository};
use crate::repo::RepoError;
use crate::service::task_service::TaskView;
use crate::service::ErrorKind;
use crate::util::{
    describe_location, format_clock_time, format_duration, format_shift_date,
    format_shift_window,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure of a session-engine operation.
#[derive(Debug)]
pub enum VisitServiceError {
    VisitNotFound(VisitId),
    AlreadyStarted(VisitId),
    NotStarted(VisitId),
    AlreadyEnded(VisitId),
    ClockInTooEarly { earliest: DateTime<Utc> },
    ClockInTooLate { latest: DateTime<Utc> },
    LocationTooFar { distance_m: f64, limit_m: f64 },
    ClockOutTooEarly { elapsed: Duration, minimum: Duration },
    Repo(RepoError),
}

impl Display for VisitServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VisitNotFound(id) => write!(f, "visit not found: {id}"),
            Self::AlreadyStarted(id) => write!(f, "visit already started: {id}"),
            Self::NotStarted(id) => write!(f, "visit not started, cannot clock out: {id}"),
            Self::AlreadyEnded(id) => write!(f, "visit already ended: {id}"),
            Self::ClockInTooEarly { earliest } => write!(
                f,
                "cannot clock in before {}",
                earliest.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            Self::ClockInTooLate { latest } => write!(
                f,
                "cannot clock in after {}",
                latest.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            Self::LocationTooFar {
                distance_m,
                limit_m,
            } => write!(
                f,
                "location is {distance_m:.0}m from the scheduled location (limit {limit_m:.0}m)"
            ),
            Self::ClockOutTooEarly { elapsed, minimum } => write!(
                f,
                "cannot clock out after {}m, minimum visit duration is {}m",
                elapsed.num_minutes(),
                minimum.num_minutes()
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VisitServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl VisitServiceError {
    /// Classification a transport layer maps onto status codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::VisitNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyStarted(_) | Self::NotStarted(_) | Self::AlreadyEnded(_) => {
                ErrorKind::StateConflict
            }
            Self::ClockInTooEarly { .. }
            | Self::ClockInTooLate { .. }
            | Self::LocationTooFar { .. }
            | Self::ClockOutTooEarly { .. } => ErrorKind::PolicyViolation,
            Self::Repo(_) => ErrorKind::PersistenceFailure,
        }
    }
}

/// Successful clock-in payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockInOutcome {
    pub clock_in_time: DateTime<Utc>,
    pub can_proceed: bool,
    /// Present when the geofence warning tier was raised.
    pub warning_message: Option<String>,
}

/// Successful clock-out payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockOutOutcome {
    pub clock_in_time: DateTime<Utc>,
    pub clock_out_time: DateTime<Utc>,
    /// Elapsed visit time, e.g. `"11m"` or `"2h 15m"`.
    pub total_duration: String,
    /// Shift date of the visit, e.g. `"Wed, 15 Jan 2025"`.
    pub date: String,
}

/// One visit in a list payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitSummary {
    pub id: VisitId,
    pub client_name: String,
    pub service_name: String,
    pub location: String,
    pub shift_time: String,
    pub shift_date: String,
    pub status: VisitStatus,
}

/// Status counters for the today view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VisitStats {
    pub missed: u64,
    pub upcoming: u64,
    pub completed: u64,
}

/// List payload: counters plus summaries ordered by start time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitList {
    pub stats: VisitStats,
    pub visits: Vec<VisitSummary>,
}

/// Detail payload for one visit, including its checklist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitDetails {
    #[serde(flatten)]
    pub summary: VisitSummary,
    pub service_notes: Option<String>,
    pub clock_in_time: Option<String>,
    pub clock_out_time: Option<String>,
    pub clock_in_location: Option<String>,
    pub clock_out_location: Option<String>,
    pub tasks: Vec<TaskView>,
}

/// Session engine over visit and task repositories.
pub struct VisitService<V: VisitRepository, T: TaskRepository> {
    config: ServiceConfig,
    visits: V,
    tasks: T,
}

impl<V: VisitRepository, T: TaskRepository> VisitService<V, T> {
    pub fn new(config: ServiceConfig, visits: V, tasks: T) -> Self {
        Self {
            config,
            visits,
            tasks,
        }
    }

    /// Records arrival at a visit.
    ///
    /// Fails without mutating state when the visit is unknown, already
    /// started, outside the allowed time window, or beyond the geofence
    /// error radius. A warning-tier distance is recorded on the visit and
    /// surfaced as a non-fatal message.
    pub fn clock_in(
        &self,
        visit_id: VisitId,
        user_id: UserId,
        observation: &GeoObservation,
    ) -> Result<ClockInOutcome, VisitServiceError> {
        let mut visit = self.load_visit(visit_id, user_id)?;

        if visit.clock_in_time.is_some() {
            return Err(VisitServiceError::AlreadyStarted(visit_id));
        }

        // Both bounds are inclusive of the boundary instant.
        let earliest = visit.start_time - self.config.max_early_clock_in();
        let latest = visit.end_time + self.config.max_late_clock_in();
        if observation.observed_at < earliest {
            return Err(VisitServiceError::ClockInTooEarly { earliest });
        }
        if observation.observed_at > latest {
            return Err(VisitServiceError::ClockInTooLate { latest });
        }

        let compliance = evaluate_location(
            visit.latitude,
            visit.longitude,
            observation.latitude,
            observation.longitude,
            self.config.max_distance_warning_m,
            self.config.max_distance_error_m,
        );
        if compliance.tier == ComplianceTier::Error {
            warn!(
                "event=clock_in module=service status=rejected visit_id={visit_id} distance_m={:.0}",
                compliance.distance_m
            );
            return Err(VisitServiceError::LocationTooFar {
                distance_m: compliance.distance_m,
                limit_m: self.config.max_distance_error_m,
            });
        }

        visit.clock_in_time = Some(observation.observed_at);
        visit.clock_in_latitude = Some(observation.latitude);
        visit.clock_in_longitude = Some(observation.longitude);
        visit.status = VisitStatus::InProgress;
        visit.compliance_flags = compliance.flag.map(|f| vec![f.to_string()]).unwrap_or_default();
        visit.validation_notes = compliance.notes;

        match self.visits.update_clock_in(&visit) {
            Ok(()) => {}
            // Lost race: another clock-in landed between our read and write.
            Err(RepoError::PreconditionFailed { .. }) => {
                return Err(VisitServiceError::AlreadyStarted(visit_id));
            }
            Err(other) => return Err(VisitServiceError::Repo(other)),
        }

        info!(
            "event=clock_in module=service status=ok visit_id={visit_id} tier={:?}",
            compliance.tier
        );

        Ok(ClockInOutcome {
            clock_in_time: observation.observed_at,
            can_proceed: true,
            warning_message: compliance.warning_message,
        })
    }

    /// Records departure from a visit.
    ///
    /// Fails without mutating state when the visit is unknown, not started,
    /// already ended, or the elapsed time is below the minimum visit
    /// duration. No geofence re-check is performed here.
    pub fn clock_out(
        &self,
        visit_id: VisitId,
        user_id: UserId,
        observation: &GeoObservation,
    ) -> Result<ClockOutOutcome, VisitServiceError> {
        let mut visit = self.load_visit(visit_id, user_id)?;

        let clock_in_time = match visit.clock_in_time {
            Some(at) => at,
            None => return Err(VisitServiceError::NotStarted(visit_id)),
        };
        if visit.clock_out_time.is_some() {
            return Err(VisitServiceError::AlreadyEnded(visit_id));
        }

        let elapsed = observation.observed_at - clock_in_time;
        let minimum = self.config.min_visit_duration();
        if elapsed < minimum {
            return Err(VisitServiceError::ClockOutTooEarly { elapsed, minimum });
        }

        visit.clock_out_time = Some(observation.observed_at);
        visit.clock_out_latitude = Some(observation.latitude);
        visit.clock_out_longitude = Some(observation.longitude);
        visit.status = VisitStatus::Completed;

        match self.visits.update_clock_out(&visit) {
            Ok(()) => {}
            // Lost race: a concurrent clock-out won between our read and write.
            Err(RepoError::PreconditionFailed { .. }) => {
                return Err(VisitServiceError::AlreadyEnded(visit_id));
            }
            Err(other) => return Err(VisitServiceError::Repo(other)),
        }

        info!(
            "event=clock_out module=service status=ok visit_id={visit_id} duration_m={}",
            elapsed.num_minutes()
        );

        Ok(ClockOutOutcome {
            clock_in_time,
            clock_out_time: observation.observed_at,
            total_duration: format_duration(elapsed),
            date: format_shift_date(visit.start_time),
        })
    }

    /// Lists visits starting on the current UTC day, with status counters.
    pub fn get_today_visits(&self, user_id: UserId) -> Result<VisitList, VisitServiceError> {
        let day_start = Utc::now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        let query = VisitListQuery {
            starts_within: Some((day_start, day_start + Duration::days(1))),
        };

        let visits = self
            .visits
            .list(user_id, &query)
            .map_err(VisitServiceError::Repo)?;

        let mut stats = VisitStats::default();
        for visit in &visits {
            match visit.status {
                VisitStatus::Scheduled => stats.upcoming += 1,
                VisitStatus::Completed => stats.completed += 1,
                VisitStatus::Cancelled => stats.missed += 1,
                VisitStatus::InProgress => {}
            }
        }

        Ok(VisitList {
            stats,
            visits: visits.iter().map(summarize).collect(),
        })
    }

    /// Lists every visit assigned to the actor, without counters.
    pub fn get_all_visits(&self, user_id: UserId) -> Result<VisitList, VisitServiceError> {
        let visits = self
            .visits
            .list(user_id, &VisitListQuery::default())
            .map_err(VisitServiceError::Repo)?;

        Ok(VisitList {
            stats: VisitStats::default(),
            visits: visits.iter().map(summarize).collect(),
        })
    }

    /// Fetches one visit with its checklist and display-ready clock facts.
    pub fn get_visit_details(
        &self,
        visit_id: VisitId,
        user_id: UserId,
    ) -> Result<VisitDetails, VisitServiceError> {
        let visit = self.load_visit(visit_id, user_id)?;
        let tasks = self
            .tasks
            .list_for_visit(visit_id)
            .map_err(VisitServiceError::Repo)?;

        Ok(detail_view(&visit, &tasks))
    }

    fn load_visit(&self, visit_id: VisitId, user_id: UserId) -> Result<Visit, VisitServiceError> {
        self.visits
            .get_by_id(visit_id, user_id)
            .map_err(VisitServiceError::Repo)?
            .ok_or(VisitServiceError::VisitNotFound(visit_id))
    }
}

fn summarize(visit: &Visit) -> VisitSummary {
    VisitSummary {
        id: visit.id,
        client_name: visit.client_name.clone(),
        service_name: visit.service_name.clone(),
        location: visit.location.clone(),
        shift_time: format_shift_window(visit.start_time, visit.end_time),
        shift_date: format_shift_date(visit.start_time),
        status: visit.status,
    }
}

fn detail_view(visit: &Visit, tasks: &[Task]) -> VisitDetails {
    let clock_in_location = visit
        .clock_in_latitude
        .zip(visit.clock_in_longitude)
        .map(|(lat, lng)| describe_location(lat, lng));
    let clock_out_location = visit
        .clock_out_latitude
        .zip(visit.clock_out_longitude)
        .map(|(lat, lng)| describe_location(lat, lng));

    VisitDetails {
        summary: summarize(visit),
        service_notes: visit.service_notes.clone(),
        clock_in_time: visit.clock_in_time.map(format_clock_time),
        clock_out_time: visit.clock_out_time.map(format_clock_time),
        clock_in_location,
        clock_out_location,
        tasks: tasks.iter().map(TaskView::from_task).collect(),
    }
}
