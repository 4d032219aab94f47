use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{from_millis, opt_from_millis, parse_column, to_millis};
use crate::error::DispatchError;
use crate::model::{JobOffer, OfferStatus};

const OFFER_COLUMNS: &str =
    "id, offer_group, fnol_id, surveyor_id, status, created_at, expires_at, accepted_at";

fn offer_from_row(row: &Row<'_>) -> rusqlite::Result<JobOffer> {
    let status: String = row.get(4)?;
    Ok(JobOffer {
        id: row.get(0)?,
        offer_group: row.get(1)?,
        fnol_id: row.get(2)?,
        surveyor_id: row.get(3)?,
        status: parse_column::<OfferStatus>(4, &status)?,
        created_at: from_millis(5, row.get(5)?)?,
        expires_at: from_millis(6, row.get(6)?)?,
        accepted_at: opt_from_millis(7, row.get(7)?)?,
    })
}

/// Insert one PENDING offer. Duplicate `(offer_group, surveyor_id)` pairs are ignored.
pub fn insert_pending(
    conn: &Connection,
    offer_group: &str,
    fnol_id: &str,
    surveyor_id: i64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<usize, DispatchError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO job_offer
            (offer_group, fnol_id, surveyor_id, status, created_at, expires_at)
         VALUES (?1, ?2, ?3, 'PENDING', ?4, ?5)",
        params![
            offer_group,
            fnol_id,
            surveyor_id,
            to_millis(created_at),
            to_millis(expires_at)
        ],
    )?;
    Ok(inserted)
}

pub fn count_accepted(conn: &Connection, offer_group: &str) -> Result<i64, DispatchError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM job_offer WHERE offer_group = ?1 AND status = 'ACCEPTED'",
        params![offer_group],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// The compare-and-swap at the heart of arbitration.
///
/// Moves the caller's offer PENDING → ACCEPTED only if it is still pending,
/// not yet expired at `now`, and no sibling in the group holds ACCEPTED. All
/// three guards are evaluated by SQLite in the same statement; the partial
/// unique index on ACCEPTED rows backs the last one. Returns rows affected.
pub fn try_accept(
    conn: &Connection,
    offer_group: &str,
    surveyor_id: i64,
    now: DateTime<Utc>,
) -> Result<usize, DispatchError> {
    let now = to_millis(now);
    let updated = conn.execute(
        "UPDATE job_offer
            SET status = 'ACCEPTED', accepted_at = ?3
          WHERE offer_group = ?1
            AND surveyor_id = ?2
            AND status = 'PENDING'
            AND expires_at > ?3
            AND NOT EXISTS (
                SELECT 1 FROM job_offer o2
                 WHERE o2.offer_group = ?1 AND o2.status = 'ACCEPTED'
            )",
        params![offer_group, surveyor_id, now],
    )?;
    Ok(updated)
}

/// Bulk PENDING → CLOSED for a group. Returns the number of offers closed.
pub fn close_pending(conn: &Connection, offer_group: &str) -> Result<usize, DispatchError> {
    let closed = conn.execute(
        "UPDATE job_offer SET status = 'CLOSED' WHERE offer_group = ?1 AND status = 'PENDING'",
        params![offer_group],
    )?;
    Ok(closed)
}

pub fn fnol_for_group(conn: &Connection, offer_group: &str) -> Result<Option<String>, DispatchError> {
    let fnol = conn
        .query_row(
            "SELECT fnol_id FROM job_offer WHERE offer_group = ?1 LIMIT 1",
            params![offer_group],
            |row| row.get(0),
        )
        .optional()?;
    Ok(fnol)
}

pub fn find(
    conn: &Connection,
    offer_group: &str,
    surveyor_id: i64,
) -> Result<Option<JobOffer>, DispatchError> {
    let offer = conn
        .query_row(
            &format!(
                "SELECT {OFFER_COLUMNS} FROM job_offer WHERE offer_group = ?1 AND surveyor_id = ?2"
            ),
            params![offer_group, surveyor_id],
            offer_from_row,
        )
        .optional()?;
    Ok(offer)
}

pub fn in_group(conn: &Connection, offer_group: &str) -> Result<Vec<JobOffer>, DispatchError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OFFER_COLUMNS} FROM job_offer WHERE offer_group = ?1 ORDER BY surveyor_id ASC"
    ))?;
    let rows = stmt.query_map(params![offer_group], offer_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// PENDING offers for a surveyor that are still unexpired at `now`.
///
/// Stored status alone is not trusted: stale PENDING rows are filtered here.
pub fn live_for_surveyor(
    conn: &Connection,
    surveyor_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<JobOffer>, DispatchError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OFFER_COLUMNS} FROM job_offer
          WHERE surveyor_id = ?1 AND status = 'PENDING' AND expires_at > ?2
          ORDER BY expires_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![surveyor_id, to_millis(now)], offer_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
