use chrono::{DateTime, Utc};

use super::Dispatcher;
use crate::availability::AvailabilityWriter;
use crate::error::DispatchError;
use crate::model::{JobAssignment, JobOffer};
use crate::store::{assignments, offers};

// Read-only lookups. None of these take part in arbitration.
impl<A: AvailabilityWriter> Dispatcher<A> {
    /// Every offer in a group, ordered by surveyor id.
    pub fn offers_in_group(&self, offer_group: &str) -> Result<Vec<JobOffer>, DispatchError> {
        let conn = self.store.connect()?;
        offers::in_group(&conn, offer_group)
    }

    pub fn find_offer(
        &self,
        offer_group: &str,
        surveyor_id: i64,
    ) -> Result<Option<JobOffer>, DispatchError> {
        let conn = self.store.connect()?;
        offers::find(&conn, offer_group, surveyor_id)
    }

    /// Offers a surveyor could still accept at `now`, soonest-expiring first.
    pub fn active_offers_for_surveyor(
        &self,
        surveyor_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobOffer>, DispatchError> {
        let conn = self.store.connect()?;
        offers::live_for_surveyor(&conn, surveyor_id, now)
    }

    pub fn find_assignment(&self, job_id: i64) -> Result<Option<JobAssignment>, DispatchError> {
        let conn = self.store.connect()?;
        assignments::find(&conn, job_id)
    }

    pub fn assignments_for_group(
        &self,
        offer_group: &str,
    ) -> Result<Vec<JobAssignment>, DispatchError> {
        let conn = self.store.connect()?;
        assignments::for_group(&conn, offer_group)
    }

    pub fn assignments_for_surveyor(
        &self,
        surveyor_id: i64,
        active_only: bool,
    ) -> Result<Vec<JobAssignment>, DispatchError> {
        let conn = self.store.connect()?;
        assignments::for_surveyor(&conn, surveyor_id, active_only)
    }
}
