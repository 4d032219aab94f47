use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::Transaction;
use tracing::{debug, info, warn};

use super::Dispatcher;
use super::closer::close_remaining_offers;
use crate::availability::AvailabilityWriter;
use crate::error::DispatchError;
use crate::model::{AcceptOutcome, AvailabilityBlock, OfferStatus};
use crate::store::{assignments, is_constraint_violation, offers, write_tx};

impl<A: AvailabilityWriter> Dispatcher<A> {
    /// Try to win `offer_group` for `surveyor_id`.
    ///
    /// Any number of callers may race on the same group; exactly one gets
    /// `ok = true` with the new job id. Everyone else gets the same
    /// "offer unavailable" outcome, whether the offer was missing, expired
    /// or taken. Storage failures are returned as errors.
    pub fn accept_offer(
        &self,
        offer_group: &str,
        surveyor_id: i64,
    ) -> Result<AcceptOutcome, DispatchError> {
        self.accept_offer_at(offer_group, surveyor_id, Utc::now())
    }

    pub fn accept_offer_at(
        &self,
        offer_group: &str,
        surveyor_id: i64,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, DispatchError> {
        let now = now.trunc_subsecs(3);
        let mut conn = self.store.connect()?;

        // Cheap early exit; the guarded update below is what decides.
        if offers::count_accepted(&conn, offer_group)? > 0 {
            self.log_rejection(offer_group, surveyor_id, now);
            return Ok(AcceptOutcome::unavailable());
        }

        let tx = write_tx(&mut conn)?;
        let won = match offers::try_accept(&tx, offer_group, surveyor_id, now) {
            Ok(updated) => updated == 1,
            Err(DispatchError::Storage(e)) if is_constraint_violation(&e) => false,
            Err(e) => return Err(e),
        };

        if !won {
            tx.rollback()?;
            self.log_rejection(offer_group, surveyor_id, now);
            return Ok(AcceptOutcome::unavailable());
        }

        match self.award(&tx, offer_group, surveyor_id, now) {
            Ok(job_id) => {
                tx.commit()?;
                info!(offer_group, surveyor_id, job_id, "offer accepted");
                Ok(AcceptOutcome::won(job_id))
            }
            Err(e) => {
                // Dropping the transaction rolls back the ACCEPTED row too.
                warn!(offer_group, surveyor_id, error = %e, "winning acceptance rolled back");
                Err(e)
            }
        }
    }

    /// Materialize a win inside the acceptance transaction: assignment,
    /// busy block, then close the siblings.
    fn award(
        &self,
        tx: &Transaction<'_>,
        offer_group: &str,
        surveyor_id: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, DispatchError> {
        let fnol_id = offers::fnol_for_group(tx, offer_group)?.ok_or_else(|| {
            DispatchError::Corrupt(format!("accepted offer group {offer_group} has no fnol id"))
        })?;

        let end = now.checked_add_signed(self.assignment_duration).ok_or_else(|| {
            DispatchError::Config(format!(
                "assignment duration {} overflows the calendar",
                self.assignment_duration
            ))
        })?;

        let job_id = assignments::insert_assigned(tx, offer_group, &fnol_id, surveyor_id, now, end)?;
        self.availability
            .create_busy_block(tx, &AvailabilityBlock::busy(surveyor_id, now, end))?;
        close_remaining_offers(tx, offer_group)?;

        Ok(job_id)
    }

    /// Why an acceptance by `surveyor_id` would be refused at `now`.
    ///
    /// Diagnostic only: it runs as a separate read and is never used to
    /// decide a race. `None` means the offer currently looks acceptable.
    pub fn rejection_cause(
        &self,
        offer_group: &str,
        surveyor_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<DispatchError>, DispatchError> {
        let conn = self.store.connect()?;
        let Some(offer) = offers::find(&conn, offer_group, surveyor_id)? else {
            return Ok(Some(DispatchError::OfferNotFound {
                offer_group: offer_group.to_string(),
                surveyor_id,
            }));
        };

        let taken = matches!(offer.status, OfferStatus::Accepted | OfferStatus::Closed)
            || offers::count_accepted(&conn, offer_group)? > 0;
        if taken {
            return Ok(Some(DispatchError::OfferAlreadyTaken(offer_group.to_string())));
        }
        if offer.status == OfferStatus::Expired || offer.expires_at <= now {
            return Ok(Some(DispatchError::OfferExpired(offer_group.to_string())));
        }
        Ok(None)
    }

    fn log_rejection(&self, offer_group: &str, surveyor_id: i64, now: DateTime<Utc>) {
        match self.rejection_cause(offer_group, surveyor_id, now) {
            Ok(Some(cause)) => debug!(offer_group, surveyor_id, %cause, "offer unavailable"),
            Ok(None) => debug!(offer_group, surveyor_id, "offer unavailable (lost race)"),
            Err(e) => debug!(offer_group, surveyor_id, error = %e, "offer unavailable, diagnosis failed"),
        }
    }
}
