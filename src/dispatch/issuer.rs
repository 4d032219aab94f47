use std::collections::BTreeSet;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::info;
use uuid::Uuid;

use super::Dispatcher;
use crate::availability::AvailabilityWriter;
use crate::error::DispatchError;
use crate::model::OfferBatch;
use crate::store::{offers, write_tx};

impl<A: AvailabilityWriter> Dispatcher<A> {
    /// Issue one PENDING offer per candidate under a fresh offer group.
    ///
    /// All offers share the group id and `expires_at = now + ttl_seconds`,
    /// at the millisecond precision the store keeps. `fnol_id` is stored
    /// exactly as given. Candidates are not notified here.
    pub fn create_offers(
        &self,
        fnol_id: &str,
        candidate_surveyor_ids: &[i64],
        ttl_seconds: i64,
    ) -> Result<OfferBatch, DispatchError> {
        self.create_offers_at(fnol_id, candidate_surveyor_ids, ttl_seconds, Utc::now())
    }

    pub fn create_offers_at(
        &self,
        fnol_id: &str,
        candidate_surveyor_ids: &[i64],
        ttl_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<OfferBatch, DispatchError> {
        if fnol_id.trim().is_empty() {
            return Err(DispatchError::Validation("fnol id must not be blank".into()));
        }
        if candidate_surveyor_ids.is_empty() {
            return Err(DispatchError::Validation(
                "candidate surveyor list must not be empty".into(),
            ));
        }
        if ttl_seconds <= 0 {
            return Err(DispatchError::Validation(format!(
                "ttl must be positive, got {ttl_seconds}"
            )));
        }
        let now = now.trunc_subsecs(3);
        let expires_at = Duration::try_seconds(ttl_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| DispatchError::Validation(format!("ttl out of range: {ttl_seconds}")))?;

        let offer_group = Uuid::new_v4().to_string();
        let candidates: BTreeSet<i64> = candidate_surveyor_ids.iter().copied().collect();

        let mut conn = self.store.connect()?;
        let tx = write_tx(&mut conn)?;
        for surveyor_id in &candidates {
            offers::insert_pending(&tx, &offer_group, fnol_id, *surveyor_id, now, expires_at)?;
        }
        tx.commit()?;

        info!(
            offer_group = %offer_group,
            fnol_id,
            candidates = candidates.len(),
            expires_at = %expires_at,
            "offers issued"
        );

        Ok(OfferBatch {
            offer_group,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::dispatch::testing::sqlite_dispatcher;
    use crate::error::DispatchError;
    use crate::model::OfferStatus;
    use chrono::{Duration, SubsecRound, TimeZone, Utc};

    #[test]
    fn creates_one_pending_offer_per_candidate() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let now = Utc::now();
        let batch = dispatcher
            .create_offers_at("FNOL-100", &[1, 2, 3], 300, now)
            .unwrap();

        assert_eq!(batch.expires_at, now.trunc_subsecs(3) + Duration::seconds(300));
        let offers = dispatcher.offers_in_group(&batch.offer_group).unwrap();
        assert_eq!(offers.len(), 3);
        for (offer, expected) in offers.iter().zip([1, 2, 3]) {
            assert_eq!(offer.surveyor_id, expected);
            assert_eq!(offer.fnol_id, "FNOL-100");
            assert_eq!(offer.status, OfferStatus::Pending);
            assert_eq!(offer.offer_group, batch.offer_group);
            assert_eq!(offer.expires_at, batch.expires_at);
            assert!(offer.accepted_at.is_none());
        }
    }

    #[test]
    fn returned_expiry_matches_the_stored_one() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let now = Utc.timestamp_opt(1_700_000_000, 587_709_753).unwrap();
        let batch = dispatcher.create_offers_at("FNOL-7", &[1], 60, now).unwrap();

        let stored = dispatcher.offers_in_group(&batch.offer_group).unwrap();
        assert_eq!(stored[0].expires_at, batch.expires_at);
        assert_eq!(stored[0].created_at, now.trunc_subsecs(3));
        assert_eq!(batch.expires_at.timestamp_subsec_nanos(), 587_000_000);
    }

    #[test]
    fn fnol_id_is_stored_verbatim() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let batch = dispatcher.create_offers(" FNOL-8 ", &[1], 60).unwrap();
        let stored = dispatcher.offers_in_group(&batch.offer_group).unwrap();
        assert_eq!(stored[0].fnol_id, " FNOL-8 ");
    }

    #[test]
    fn each_batch_gets_a_fresh_group() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let a = dispatcher.create_offers("FNOL-1", &[1], 60).unwrap();
        let b = dispatcher.create_offers("FNOL-1", &[1], 60).unwrap();
        assert_ne!(a.offer_group, b.offer_group);
    }

    #[test]
    fn duplicate_candidates_collapse() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let batch = dispatcher.create_offers("FNOL-2", &[4, 4, 5], 60).unwrap();
        assert_eq!(dispatcher.offers_in_group(&batch.offer_group).unwrap().len(), 2);
    }

    #[test]
    fn rejects_invalid_input_before_writing() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let cases = [
            ("FNOL-3", vec![], 60),
            ("FNOL-3", vec![1], 0),
            ("FNOL-3", vec![1], -5),
            ("   ", vec![1], 60),
            ("FNOL-3", vec![1], i64::MAX),
        ];
        for (fnol, candidates, ttl) in cases {
            let err = dispatcher.create_offers(fnol, &candidates, ttl).unwrap_err();
            assert!(matches!(err, DispatchError::Validation(_)), "{err}");
        }
        assert!(dispatcher.active_offers_for_surveyor(1, Utc::now()).unwrap().is_empty());
    }
}
