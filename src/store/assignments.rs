use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{from_millis, opt_from_millis, parse_column, to_millis};
use crate::error::DispatchError;
use crate::model::{AssignmentStatus, JobAssignment};

const ASSIGNMENT_COLUMNS: &str = "id, offer_group, fnol_id, surveyor_id, status, start_time, end_time, created_at, completed_at";

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<JobAssignment> {
    let status: String = row.get(4)?;
    Ok(JobAssignment {
        id: row.get(0)?,
        offer_group: row.get(1)?,
        fnol_id: row.get(2)?,
        surveyor_id: row.get(3)?,
        status: parse_column::<AssignmentStatus>(4, &status)?,
        start_time: from_millis(5, row.get(5)?)?,
        end_time: from_millis(6, row.get(6)?)?,
        created_at: from_millis(7, row.get(7)?)?,
        completed_at: opt_from_millis(8, row.get(8)?)?,
    })
}

/// Insert an ASSIGNED job and return its id.
pub fn insert_assigned(
    conn: &Connection,
    offer_group: &str,
    fnol_id: &str,
    surveyor_id: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<i64, DispatchError> {
    conn.execute(
        "INSERT INTO job_assignment
            (offer_group, fnol_id, surveyor_id, status, start_time, end_time, created_at)
         VALUES (?1, ?2, ?3, 'ASSIGNED', ?4, ?5, ?4)",
        params![
            offer_group,
            fnol_id,
            surveyor_id,
            to_millis(start_time),
            to_millis(end_time)
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// ASSIGNED → COMPLETED. Returns rows affected (0 or 1).
pub fn complete(conn: &Connection, job_id: i64, now: DateTime<Utc>) -> Result<usize, DispatchError> {
    let updated = conn.execute(
        "UPDATE job_assignment
            SET status = 'COMPLETED', completed_at = ?2
          WHERE id = ?1 AND status = 'ASSIGNED'",
        params![job_id, to_millis(now)],
    )?;
    Ok(updated)
}

pub fn find(conn: &Connection, job_id: i64) -> Result<Option<JobAssignment>, DispatchError> {
    let assignment = conn
        .query_row(
            &format!("SELECT {ASSIGNMENT_COLUMNS} FROM job_assignment WHERE id = ?1"),
            params![job_id],
            assignment_from_row,
        )
        .optional()?;
    Ok(assignment)
}

pub fn for_group(conn: &Connection, offer_group: &str) -> Result<Vec<JobAssignment>, DispatchError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM job_assignment WHERE offer_group = ?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![offer_group], assignment_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn for_surveyor(
    conn: &Connection,
    surveyor_id: i64,
    active_only: bool,
) -> Result<Vec<JobAssignment>, DispatchError> {
    let sql = if active_only {
        format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM job_assignment
              WHERE surveyor_id = ?1 AND status = 'ASSIGNED' ORDER BY start_time ASC, id ASC"
        )
    } else {
        format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM job_assignment
              WHERE surveyor_id = ?1 ORDER BY start_time ASC, id ASC"
        )
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![surveyor_id], assignment_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{is_constraint_violation, testing::temp_store};
    use chrono::Duration;

    #[test]
    fn insert_then_complete_once() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        let start = Utc::now();
        let id = insert_assigned(&conn, "g", "F", 3, start, start + Duration::hours(2)).unwrap();

        let job = find(&conn, id).unwrap().unwrap();
        assert_eq!(job.status, AssignmentStatus::Assigned);
        assert_eq!(job.surveyor_id, 3);
        assert!(job.completed_at.is_none());

        assert_eq!(complete(&conn, id, start).unwrap(), 1);
        assert_eq!(complete(&conn, id, start).unwrap(), 0);
        let job = find(&conn, id).unwrap().unwrap();
        assert_eq!(job.status, AssignmentStatus::Completed);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn one_assignment_per_group() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        let start = Utc::now();
        let end = start + Duration::hours(2);
        insert_assigned(&conn, "g", "F", 1, start, end).unwrap();
        let err = insert_assigned(&conn, "g", "F", 2, start, end).unwrap_err();
        match err {
            DispatchError::Storage(e) => assert!(is_constraint_violation(&e)),
            other => panic!("expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn surveyor_listing_respects_active_filter() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        let start = Utc::now();
        let end = start + Duration::hours(2);
        let done = insert_assigned(&conn, "g1", "F1", 4, start, end).unwrap();
        insert_assigned(&conn, "g2", "F2", 4, start, end).unwrap();
        insert_assigned(&conn, "g3", "F3", 5, start, end).unwrap();
        complete(&conn, done, start).unwrap();

        assert_eq!(for_surveyor(&conn, 4, false).unwrap().len(), 2);
        let active = for_surveyor(&conn, 4, true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].offer_group, "g2");
        assert_eq!(for_group(&conn, "g3").unwrap()[0].surveyor_id, 5);
    }
}
