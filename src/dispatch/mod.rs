//! The offer allocation engine.
//!
//! [`Dispatcher`] issues offer batches, arbitrates acceptances so that each
//! group has at most one winner, materializes the winner's assignment and
//! busy block, and completes jobs. It holds no locks of its own: all
//! coordination between concurrent callers happens inside SQLite.

mod arbiter;
mod closer;
mod completion;
mod issuer;
mod queries;
mod race;

use chrono::Duration;

use crate::availability::{AvailabilityWriter, SqliteAvailability};
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::store::Store;

pub use race::{RaceReport, race_offer};

/// Drives offers and assignments through their lifecycles.
#[derive(Debug, Clone)]
pub struct Dispatcher<A = SqliteAvailability> {
    store: Store,
    availability: A,
    /// Length of the busy window booked for a winner, starting at acceptance.
    assignment_duration: Duration,
}

impl<A: AvailabilityWriter> Dispatcher<A> {
    pub fn new(store: Store, availability: A, assignment_duration: Duration) -> Self {
        Self {
            store,
            availability,
            assignment_duration,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn availability(&self) -> &A {
        &self.availability
    }

    pub fn assignment_duration(&self) -> Duration {
        self.assignment_duration
    }
}

impl Dispatcher<SqliteAvailability> {
    /// Open the configured database and wire the SQLite availability adapter.
    pub fn from_config(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let store = Store::open(&config.database_path, config.busy_timeout())?;
        let availability = SqliteAvailability::new(store.clone());
        Ok(Self::new(store, availability, config.assignment_duration()))
    }
}
