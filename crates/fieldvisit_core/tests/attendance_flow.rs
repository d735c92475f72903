//! End-to-end attendance scenario: a 09:00-10:00 visit with a 15 minute
//! early window, 30 minute late window and 10 minute minimum duration,
//! reference location (1.0, 1.0).

use chrono::{DateTime, TimeZone, Utc};
use fieldvisit_core::db::open_db_in_memory;
use fieldvisit_core::{
    GeoObservation, ServiceConfig, SqliteTaskRepository, SqliteVisitRepository, Task,
    TaskRepository, TaskService, TaskServiceError, TaskStatusUpdate, Visit, VisitRepository,
    VisitService, VisitServiceError, VisitStatus,
};
use uuid::Uuid;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, hour, minute, 0).unwrap()
}

fn here(when: DateTime<Utc>) -> GeoObservation {
    GeoObservation::new(1.0, 1.0, Some(when)).unwrap()
}

#[test]
fn full_visit_lifecycle() {
    let conn = open_db_in_memory().unwrap();
    let user_id = Uuid::new_v4();

    let visit = Visit::new(
        user_id,
        "Acme Care",
        "Home check",
        "12 Main St",
        1.0,
        1.0,
        at(9, 0),
        at(10, 0),
    );
    SqliteVisitRepository::new(&conn).create_visit(&visit).unwrap();
    let task = Task::new(visit.id, "Check medication");
    SqliteTaskRepository::new(&conn).create_task(&task).unwrap();

    let config = ServiceConfig {
        max_early_clock_in_secs: 15 * 60,
        max_late_clock_in_secs: 30 * 60,
        min_visit_duration_secs: 10 * 60,
        ..ServiceConfig::default()
    };
    let visits = VisitService::new(
        config,
        SqliteVisitRepository::new(&conn),
        SqliteTaskRepository::new(&conn),
    );
    let tasks = TaskService::new(
        SqliteTaskRepository::new(&conn),
        SqliteVisitRepository::new(&conn),
    );

    // Tasks are locked until the visit is in progress.
    let err = tasks
        .update_task(task.id, user_id, TaskStatusUpdate::Completed, None)
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::VisitNotInProgress(_)));

    // One second before the early window opens.
    let err = visits
        .clock_in(visit.id, user_id, &here(at(8, 44)))
        .unwrap_err();
    assert!(matches!(err, VisitServiceError::ClockInTooEarly { .. }));

    // Exactly at the boundary instant, on location: allowed, tier none.
    let outcome = visits.clock_in(visit.id, user_id, &here(at(8, 45))).unwrap();
    assert_eq!(outcome.clock_in_time, at(8, 45));
    assert_eq!(outcome.warning_message, None);

    let err = visits
        .clock_in(visit.id, user_id, &here(at(8, 50)))
        .unwrap_err();
    assert!(matches!(err, VisitServiceError::AlreadyStarted(_)));

    // Five minutes on site is below the ten minute minimum.
    let err = visits
        .clock_out(visit.id, user_id, &here(at(8, 50)))
        .unwrap_err();
    assert!(matches!(err, VisitServiceError::ClockOutTooEarly { .. }));

    // The checklist can be worked while the visit is in progress.
    let view = tasks
        .update_task(task.id, user_id, TaskStatusUpdate::Completed, None)
        .unwrap();
    assert!(view.completed_at.is_some());

    let outcome = visits.clock_out(visit.id, user_id, &here(at(8, 56))).unwrap();
    assert_eq!(outcome.total_duration, "11m");
    assert_eq!(outcome.clock_in_time, at(8, 45));
    assert_eq!(outcome.clock_out_time, at(8, 56));
    assert_eq!(outcome.date, "Wed, 15 Jan 2025");

    let stored = SqliteVisitRepository::new(&conn)
        .get_by_id(visit.id, user_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, VisitStatus::Completed);

    // The completed visit is frozen: no further clocking or task work.
    let err = visits
        .clock_out(visit.id, user_id, &here(at(9, 30)))
        .unwrap_err();
    assert!(matches!(err, VisitServiceError::AlreadyEnded(_)));
    let err = tasks
        .update_task(task.id, user_id, TaskStatusUpdate::Completed, None)
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::VisitNotInProgress(_)));
}
