use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::OfferStatus;

/// One competing offer of a job to a single surveyor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOffer {
    pub id: i64,
    pub offer_group: String,
    pub fnol_id: String,
    pub surveyor_id: i64,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl JobOffer {
    /// Liveness as seen by readers.
    ///
    /// Nothing sweeps stale rows to EXPIRED, so a stored `Pending` status
    /// only counts while `expires_at` is still ahead of `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Pending && self.expires_at > now
    }

    /// The status a reader should display: stale PENDING rows read as EXPIRED.
    pub fn effective_status(&self, now: DateTime<Utc>) -> OfferStatus {
        if self.status == OfferStatus::Pending && self.expires_at <= now {
            OfferStatus::Expired
        } else {
            self.status
        }
    }
}

/// Result of issuing a batch of offers for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferBatch {
    pub offer_group: String,
    pub expires_at: DateTime<Utc>,
}
