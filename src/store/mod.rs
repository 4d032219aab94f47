//! SQLite persistence for offers, assignments and busy blocks.
//!
//! The database file is the only coordination point between concurrent
//! callers. Every operation opens its own short-lived connection; writers
//! take the database write lock up front (`BEGIN IMMEDIATE`) and wait at
//! most `busy_timeout` for it.

pub mod assignments;
pub mod offers;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};

use crate::error::DispatchError;

/// Handle to the dispatch database. Cheap to clone; holds no open connection.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    /// Open (creating if needed) the database at `path` and apply migrations.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, DispatchError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout,
        };
        let conn = store.connect()?;
        // WAL is persistent on the file, so setting it once is enough.
        let _mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        migrate(&conn)?;
        tracing::debug!(path = %store.path.display(), "dispatch store ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh connection configured for this store.
    pub fn connect(&self) -> Result<Connection, DispatchError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }
}

/// Start a transaction that holds the write lock from its first statement.
///
/// Deferred transactions would let two writers both read a PENDING offer and
/// only collide at commit; IMMEDIATE makes the guard and the write one step.
pub fn write_tx(conn: &mut Connection) -> Result<Transaction<'_>, DispatchError> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// True when a statement was rejected by a UNIQUE or CHECK constraint.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            Box::new(DispatchError::Corrupt(format!("timestamp out of range: {ms}"))),
        )
    })
}

pub(crate) fn opt_from_millis(
    idx: usize,
    ms: Option<i64>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    ms.map(|ms| from_millis(idx, ms)).transpose()
}

pub(crate) fn parse_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = DispatchError>,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn migrate(conn: &Connection) -> Result<(), DispatchError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS job_offer (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            offer_group TEXT NOT NULL,
            fnol_id TEXT NOT NULL,
            surveyor_id INTEGER NOT NULL,
            status TEXT NOT NULL
                CHECK (status IN ('PENDING', 'ACCEPTED', 'CLOSED', 'EXPIRED')),
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            accepted_at INTEGER,
            UNIQUE (offer_group, surveyor_id)
        );

        -- At most one winner per group, enforced by the database itself.
        CREATE UNIQUE INDEX IF NOT EXISTS job_offer_one_accepted
            ON job_offer (offer_group) WHERE status = 'ACCEPTED';

        CREATE INDEX IF NOT EXISTS job_offer_by_surveyor
            ON job_offer (surveyor_id, status);

        CREATE TABLE IF NOT EXISTS job_assignment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            offer_group TEXT NOT NULL UNIQUE,
            fnol_id TEXT NOT NULL,
            surveyor_id INTEGER NOT NULL,
            status TEXT NOT NULL
                CHECK (status IN ('ASSIGNED', 'COMPLETED', 'CANCELLED')),
            start_time INTEGER NOT NULL,
            end_time INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            completed_at INTEGER
        );

        CREATE INDEX IF NOT EXISTS job_assignment_by_surveyor
            ON job_assignment (surveyor_id, status);

        CREATE TABLE IF NOT EXISTS surveyor_availability (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            surveyor_id INTEGER NOT NULL,
            start_time INTEGER NOT NULL,
            end_time INTEGER NOT NULL,
            state TEXT NOT NULL,
            source TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS surveyor_availability_by_surveyor
            ON surveyor_availability (surveyor_id, start_time);
        ",
    )?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tempfile::TempDir;

    /// A store on a throwaway file; keep the `TempDir` alive for the test.
    pub fn temp_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("dispatch.db"), Duration::from_secs(5)).unwrap();
        (dir, store)
    }
}
