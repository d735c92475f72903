//! Visit repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Fetch visits by identity and list them per actor.
//! - Persist clock-in/clock-out state transitions behind conditional updates.
//!
//! # Invariants
//! - `update_clock_in` writes only rows whose `clock_in_time` is still NULL.
//! - `update_clock_out` writes only rows already clocked in and not yet
//!   clocked out.
//! - Both return `PreconditionFailed` when the guard matched no row.

use crate::model::visit::{UserId, Visit, VisitId, VisitStatus};
use crate::repo::{datetime_from_ms, datetime_to_ms, uuid_from_text, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

const VISIT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    client_name,
    service_name,
    service_notes,
    location,
    latitude,
    longitude,
    start_time,
    end_time,
    status,
    clock_in_time,
    clock_in_latitude,
    clock_in_longitude,
    clock_out_time,
    clock_out_latitude,
    clock_out_longitude,
    compliance_flags,
    validation_notes
FROM visits";

/// Filter options for listing visits.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisitListQuery {
    /// Half-open `[start, end)` window the visit's `start_time` must fall in.
    pub starts_within: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Repository interface for visit reads and clock-fact writes.
///
/// `create_visit` exists for the external scheduling process (and tests);
/// the session engine never creates visits.
pub trait VisitRepository {
    fn create_visit(&self, visit: &Visit) -> RepoResult<VisitId>;
    fn get_by_id(&self, visit_id: VisitId, user_id: UserId) -> RepoResult<Option<Visit>>;
    fn list(&self, user_id: UserId, query: &VisitListQuery) -> RepoResult<Vec<Visit>>;
    fn update_clock_in(&self, visit: &Visit) -> RepoResult<()>;
    fn update_clock_out(&self, visit: &Visit) -> RepoResult<()>;
}

/// SQLite-backed visit repository.
pub struct SqliteVisitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVisitRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VisitRepository for SqliteVisitRepository<'_> {
    fn create_visit(&self, visit: &Visit) -> RepoResult<VisitId> {
        visit.validate()?;

        self.conn.execute(
            "INSERT INTO visits (
                id, user_id, client_name, service_name, service_notes, location,
                latitude, longitude, start_time, end_time, status,
                clock_in_time, clock_in_latitude, clock_in_longitude,
                clock_out_time, clock_out_latitude, clock_out_longitude,
                compliance_flags, validation_notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19);",
            params![
                visit.id.to_string(),
                visit.user_id.to_string(),
                visit.client_name.as_str(),
                visit.service_name.as_str(),
                visit.service_notes.as_deref(),
                visit.location.as_str(),
                visit.latitude,
                visit.longitude,
                datetime_to_ms(visit.start_time),
                datetime_to_ms(visit.end_time),
                visit.status.as_str(),
                visit.clock_in_time.map(datetime_to_ms),
                visit.clock_in_latitude,
                visit.clock_in_longitude,
                visit.clock_out_time.map(datetime_to_ms),
                visit.clock_out_latitude,
                visit.clock_out_longitude,
                flags_to_db(&visit.compliance_flags),
                visit.validation_notes.as_deref(),
            ],
        )?;

        Ok(visit.id)
    }

    fn get_by_id(&self, visit_id: VisitId, user_id: UserId) -> RepoResult<Option<Visit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VISIT_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"))?;

        let mut rows = stmt.query(params![visit_id.to_string(), user_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_visit_row(row)?));
        }

        Ok(None)
    }

    fn list(&self, user_id: UserId, query: &VisitListQuery) -> RepoResult<Vec<Visit>> {
        let mut sql = format!("{VISIT_SELECT_SQL} WHERE user_id = ?1");
        if query.starts_within.is_some() {
            sql.push_str(" AND start_time >= ?2 AND start_time < ?3");
        }
        sql.push_str(" ORDER BY start_time ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = match query.starts_within {
            Some((from, until)) => stmt.query(params![
                user_id.to_string(),
                datetime_to_ms(from),
                datetime_to_ms(until)
            ])?,
            None => stmt.query(params![user_id.to_string()])?,
        };

        let mut visits = Vec::new();
        while let Some(row) = rows.next()? {
            visits.push(parse_visit_row(row)?);
        }

        Ok(visits)
    }

    fn update_clock_in(&self, visit: &Visit) -> RepoResult<()> {
        visit.validate()?;

        let changed = self.conn.execute(
            "UPDATE visits
             SET
                clock_in_time = ?1,
                clock_in_latitude = ?2,
                clock_in_longitude = ?3,
                status = ?4,
                compliance_flags = ?5,
                validation_notes = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?7 AND user_id = ?8 AND clock_in_time IS NULL;",
            params![
                visit.clock_in_time.map(datetime_to_ms),
                visit.clock_in_latitude,
                visit.clock_in_longitude,
                visit.status.as_str(),
                flags_to_db(&visit.compliance_flags),
                visit.validation_notes.as_deref(),
                visit.id.to_string(),
                visit.user_id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::PreconditionFailed {
                entity: "visit",
                id: visit.id,
            });
        }

        Ok(())
    }

    fn update_clock_out(&self, visit: &Visit) -> RepoResult<()> {
        visit.validate()?;

        let changed = self.conn.execute(
            "UPDATE visits
             SET
                clock_out_time = ?1,
                clock_out_latitude = ?2,
                clock_out_longitude = ?3,
                status = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?5 AND user_id = ?6
               AND clock_in_time IS NOT NULL
               AND clock_out_time IS NULL;",
            params![
                visit.clock_out_time.map(datetime_to_ms),
                visit.clock_out_latitude,
                visit.clock_out_longitude,
                visit.status.as_str(),
                visit.id.to_string(),
                visit.user_id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::PreconditionFailed {
                entity: "visit",
                id: visit.id,
            });
        }

        Ok(())
    }
}

fn parse_visit_row(row: &Row<'_>) -> RepoResult<Visit> {
    let id = uuid_from_text(&row.get::<_, String>("id")?, "visits.id")?;
    let user_id = uuid_from_text(&row.get::<_, String>("user_id")?, "visits.user_id")?;

    let status_text: String = row.get("status")?;
    let status = VisitStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid visit status `{status_text}` in visits.status"))
    })?;

    let visit = Visit {
        id,
        user_id,
        client_name: row.get("client_name")?,
        service_name: row.get("service_name")?,
        service_notes: row.get("service_notes")?,
        location: row.get("location")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        start_time: datetime_from_ms(row.get("start_time")?, "visits.start_time")?,
        end_time: datetime_from_ms(row.get("end_time")?, "visits.end_time")?,
        status,
        clock_in_time: optional_datetime(row, "clock_in_time", "visits.clock_in_time")?,
        clock_in_latitude: row.get("clock_in_latitude")?,
        clock_in_longitude: row.get("clock_in_longitude")?,
        clock_out_time: optional_datetime(row, "clock_out_time", "visits.clock_out_time")?,
        clock_out_latitude: row.get("clock_out_latitude")?,
        clock_out_longitude: row.get("clock_out_longitude")?,
        compliance_flags: flags_from_db(&row.get::<_, String>("compliance_flags")?),
        validation_notes: row.get("validation_notes")?,
    };
    visit.validate()?;
    Ok(visit)
}

fn optional_datetime(
    row: &Row<'_>,
    index: &str,
    column: &str,
) -> RepoResult<Option<chrono::DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(index)? {
        Some(ms) => Ok(Some(datetime_from_ms(ms, column)?)),
        None => Ok(None),
    }
}

// Flags are short uppercase tags; a comma-joined column keeps the schema
// simple while preserving raise order.
fn flags_to_db(flags: &[String]) -> String {
    flags.join(",")
}

fn flags_from_db(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(',').map(str::to_string).collect()
}
