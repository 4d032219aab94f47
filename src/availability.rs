//! Calendar blocking for surveyors who win a job.
//!
//! [`AvailabilityWriter`] is the port the arbiter calls while its winning
//! transaction is still open. [`SqliteAvailability`] writes into the same
//! database, so a rolled-back acceptance also rolls back its busy block.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};

use crate::error::DispatchError;
use crate::model::{AvailabilityBlock, BUSY_STATE};
use crate::store::{Store, from_millis, to_millis};

/// Records busy windows on behalf of the dispatch engine.
///
/// Implementations receive the open acceptance transaction. Returning an
/// error aborts the acceptance as a whole.
pub trait AvailabilityWriter: Send + Sync {
    fn create_busy_block(
        &self,
        tx: &Transaction<'_>,
        block: &AvailabilityBlock,
    ) -> Result<(), DispatchError>;
}

impl<T: AvailabilityWriter + ?Sized> AvailabilityWriter for Arc<T> {
    fn create_busy_block(
        &self,
        tx: &Transaction<'_>,
        block: &AvailabilityBlock,
    ) -> Result<(), DispatchError> {
        (**self).create_busy_block(tx, block)
    }
}

/// Availability adapter backed by the `surveyor_availability` table.
///
/// Overlapping blocks are not checked; conflict detection belongs to the
/// calendar service.
#[derive(Debug, Clone)]
pub struct SqliteAvailability {
    store: Store,
}

impl SqliteAvailability {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// All blocks for a surveyor, earliest first.
    pub fn busy_blocks_for(&self, surveyor_id: i64) -> Result<Vec<AvailabilityBlock>, DispatchError> {
        let conn = self.store.connect()?;
        blocks_for(&conn, surveyor_id)
    }

    /// `"BUSY"` when a block covers `at`, otherwise `"AVAILABLE"`.
    pub fn current_state(&self, surveyor_id: i64, at: DateTime<Utc>) -> Result<String, DispatchError> {
        let busy = self
            .busy_blocks_for(surveyor_id)?
            .iter()
            .any(|b| b.state == BUSY_STATE && b.covers(at));
        let state = if busy { BUSY_STATE } else { "AVAILABLE" };
        Ok(state.to_string())
    }
}

impl AvailabilityWriter for SqliteAvailability {
    fn create_busy_block(
        &self,
        tx: &Transaction<'_>,
        block: &AvailabilityBlock,
    ) -> Result<(), DispatchError> {
        tx.execute(
            "INSERT INTO surveyor_availability
                (surveyor_id, start_time, end_time, state, source, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                block.surveyor_id,
                to_millis(block.start_time),
                to_millis(block.end_time),
                block.state,
                block.source,
                to_millis(Utc::now()),
            ],
        )?;
        Ok(())
    }
}

fn blocks_for(conn: &Connection, surveyor_id: i64) -> Result<Vec<AvailabilityBlock>, DispatchError> {
    let mut stmt = conn.prepare(
        "SELECT surveyor_id, start_time, end_time, state, source
           FROM surveyor_availability
          WHERE surveyor_id = ?1
          ORDER BY start_time ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![surveyor_id], |row| {
        Ok(AvailabilityBlock {
            surveyor_id: row.get(0)?,
            start_time: from_millis(1, row.get(1)?)?,
            end_time: from_millis(2, row.get(2)?)?,
            state: row.get(3)?,
            source: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::Mutex;

    use super::*;

    /// Remembers every block it was asked to write; touches no table.
    #[derive(Debug, Default)]
    pub struct RecordingAvailability {
        pub blocks: Mutex<Vec<AvailabilityBlock>>,
    }

    impl RecordingAvailability {
        pub fn recorded(&self) -> Vec<AvailabilityBlock> {
            self.blocks.lock().unwrap().clone()
        }
    }

    impl AvailabilityWriter for RecordingAvailability {
        fn create_busy_block(
            &self,
            _tx: &Transaction<'_>,
            block: &AvailabilityBlock,
        ) -> Result<(), DispatchError> {
            self.blocks.lock().unwrap().push(block.clone());
            Ok(())
        }
    }

    /// Always refuses, to exercise rollback of a winning acceptance.
    #[derive(Debug, Default)]
    pub struct FailingAvailability;

    impl AvailabilityWriter for FailingAvailability {
        fn create_busy_block(
            &self,
            _tx: &Transaction<'_>,
            _block: &AvailabilityBlock,
        ) -> Result<(), DispatchError> {
            Err(DispatchError::Availability("calendar unavailable".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{testing::temp_store, write_tx};
    use chrono::Duration;

    #[test]
    fn block_is_visible_after_commit() {
        let (_dir, store) = temp_store();
        let availability = SqliteAvailability::new(store.clone());
        let start = Utc::now();
        let block = AvailabilityBlock::busy(12, start, start + Duration::hours(2));

        let mut conn = store.connect().unwrap();
        let tx = write_tx(&mut conn).unwrap();
        availability.create_busy_block(&tx, &block).unwrap();
        tx.commit().unwrap();

        let blocks = availability.busy_blocks_for(12).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "dispatch");
        assert_eq!(blocks[0].end_time - blocks[0].start_time, Duration::hours(2));
        assert_eq!(availability.current_state(12, start + Duration::minutes(5)).unwrap(), "BUSY");
        assert_eq!(
            availability.current_state(12, start + Duration::hours(3)).unwrap(),
            "AVAILABLE"
        );
    }

    #[test]
    fn block_disappears_on_rollback() {
        let (_dir, store) = temp_store();
        let availability = SqliteAvailability::new(store.clone());
        let start = Utc::now();

        let mut conn = store.connect().unwrap();
        let tx = write_tx(&mut conn).unwrap();
        availability
            .create_busy_block(&tx, &AvailabilityBlock::busy(3, start, start + Duration::hours(1)))
            .unwrap();
        drop(tx);

        assert!(availability.busy_blocks_for(3).unwrap().is_empty());
        assert_eq!(availability.current_state(3, start).unwrap(), "AVAILABLE");
    }
}
