use chrono::{DateTime, Duration, TimeZone, Utc};
use fieldvisit_core::db::open_db_in_memory;
use fieldvisit_core::{
    ErrorKind, GeoObservation, ServiceConfig, SqliteTaskRepository, SqliteVisitRepository, Visit,
    VisitRepository, VisitService, VisitServiceError, VisitStatus,
};
use rusqlite::Connection;
use uuid::Uuid;

fn shift_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
}

fn seed_visit(conn: &Connection, user_id: Uuid) -> Visit {
    let visit = Visit::new(
        user_id,
        "Acme Care",
        "Home check",
        "12 Main St",
        1.0,
        1.0,
        shift_start(),
        shift_start() + Duration::hours(1),
    );
    SqliteVisitRepository::new(conn).create_visit(&visit).unwrap();
    visit
}

fn service(
    conn: &Connection,
) -> VisitService<SqliteVisitRepository<'_>, SqliteTaskRepository<'_>> {
    VisitService::new(
        ServiceConfig::default(),
        SqliteVisitRepository::new(conn),
        SqliteTaskRepository::new(conn),
    )
}

fn at_reference(at: DateTime<Utc>) -> GeoObservation {
    GeoObservation::new(1.0, 1.0, Some(at)).unwrap()
}

#[test]
fn clock_out_before_clock_in_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let user_id = Uuid::new_v4();
    let visit = seed_visit(&conn, user_id);
    let svc = service(&conn);

    let err = svc
        .clock_out(visit.id, user_id, &at_reference(shift_start()))
        .unwrap_err();
    assert!(matches!(err, VisitServiceError::NotStarted(id) if id == visit.id));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
}

#[test]
fn clock_out_completes_the_visit() {
    let conn = open_db_in_memory().unwrap();
    let user_id = Uuid::new_v4();
    let visit = seed_visit(&conn, user_id);
    let svc = service(&conn);

    let clock_in_at = shift_start();
    let clock_out_at = shift_start() + Duration::minutes(55);
    svc.clock_in(visit.id, user_id, &at_reference(clock_in_at))
        .unwrap();
    let outcome = svc
        .clock_out(visit.id, user_id, &at_reference(clock_out_at))
        .unwrap();

    assert_eq!(outcome.clock_in_time, clock_in_at);
    assert_eq!(outcome.clock_out_time, clock_out_at);
    assert_eq!(outcome.total_duration, "55m");
    assert_eq!(outcome.date, "Wed, 15 Jan 2025");

    let stored = SqliteVisitRepository::new(&conn)
        .get_by_id(visit.id, user_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, VisitStatus::Completed);
    assert_eq!(stored.clock_out_time, Some(clock_out_at));
    assert_eq!(stored.clock_out_latitude, Some(1.0));
    assert_eq!(stored.clock_out_longitude, Some(1.0));
}

#[test]
fn long_visits_render_hours_and_minutes() {
    let conn = open_db_in_memory().unwrap();
    let user_id = Uuid::new_v4();
    let visit = seed_visit(&conn, user_id);
    let svc = service(&conn);

    svc.clock_in(visit.id, user_id, &at_reference(shift_start()))
        .unwrap();
    let outcome = svc
        .clock_out(
            visit.id,
            user_id,
            &at_reference(shift_start() + Duration::minutes(135)),
        )
        .unwrap();
    assert_eq!(outcome.total_duration, "2h 15m");
}

#[test]
fn minimum_duration_boundary_is_inclusive() {
    let conn = open_db_in_memory().unwrap();
    let user_id = Uuid::new_v4();
    let visit = seed_visit(&conn, user_id);
    let svc = service(&conn);

    svc.clock_in(visit.id, user_id, &at_reference(shift_start()))
        .unwrap();

    let err = svc
        .clock_out(
            visit.id,
            user_id,
            &at_reference(shift_start() + Duration::minutes(5)),
        )
        .unwrap_err();
    assert!(matches!(err, VisitServiceError::ClockOutTooEarly { .. }));
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);

    // Still in progress after the rejection.
    let stored = SqliteVisitRepository::new(&conn)
        .get_by_id(visit.id, user_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, VisitStatus::InProgress);
    assert_eq!(stored.clock_out_time, None);

    // Exactly the minimum duration is allowed.
    svc.clock_out(
        visit.id,
        user_id,
        &at_reference(shift_start() + Duration::minutes(10)),
    )
    .unwrap();
}

#[test]
fn second_clock_out_is_a_state_conflict() {
    let conn = open_db_in_memory().unwrap();
    let user_id = Uuid::new_v4();
    let visit = seed_visit(&conn, user_id);
    let svc = service(&conn);

    svc.clock_in(visit.id, user_id, &at_reference(shift_start()))
        .unwrap();
    svc.clock_out(
        visit.id,
        user_id,
        &at_reference(shift_start() + Duration::minutes(30)),
    )
    .unwrap();

    let err = svc
        .clock_out(
            visit.id,
            user_id,
            &at_reference(shift_start() + Duration::minutes(40)),
        )
        .unwrap_err();
    assert!(matches!(err, VisitServiceError::AlreadyEnded(id) if id == visit.id));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
}

#[test]
fn clock_out_ignores_geofence_distance() {
    // Product decision under review: departure location is recorded but not
    // validated against the geofence.
    let conn = open_db_in_memory().unwrap();
    let user_id = Uuid::new_v4();
    let visit = seed_visit(&conn, user_id);
    let svc = service(&conn);

    svc.clock_in(visit.id, user_id, &at_reference(shift_start()))
        .unwrap();

    let far_away =
        GeoObservation::new(50.0, 100.0, Some(shift_start() + Duration::minutes(30))).unwrap();
    let outcome = svc.clock_out(visit.id, user_id, &far_away).unwrap();
    assert_eq!(outcome.total_duration, "30m");

    let stored = SqliteVisitRepository::new(&conn)
        .get_by_id(visit.id, user_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.clock_out_latitude, Some(50.0));
    assert_eq!(stored.clock_out_longitude, Some(100.0));
}

#[test]
fn clock_out_unknown_visit_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let svc = service(&conn);

    let err = svc
        .clock_out(Uuid::new_v4(), Uuid::new_v4(), &at_reference(shift_start()))
        .unwrap_err();
    assert!(matches!(err, VisitServiceError::VisitNotFound(_)));
}
