use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::AssignmentStatus;

/// The job awarded to the surveyor who won an offer group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAssignment {
    /// Job id handed back to the winning caller.
    pub id: i64,
    pub offer_group: String,
    pub fnol_id: String,
    pub surveyor_id: i64,
    pub status: AssignmentStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A calendar window during which a surveyor is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityBlock {
    pub surveyor_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub state: String,
    pub source: String,
}

pub const BUSY_STATE: &str = "BUSY";
pub const DISPATCH_SOURCE: &str = "dispatch";

impl AvailabilityBlock {
    pub fn busy(surveyor_id: i64, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            surveyor_id,
            start_time,
            end_time,
            state: BUSY_STATE.to_string(),
            source: DISPATCH_SOURCE.to_string(),
        }
    }

    /// Half-open containment: `[start_time, end_time)`.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }
}

/// Outcome of an acceptance attempt as returned to every caller.
///
/// Losers all see the same `reason`, whatever the underlying cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOutcome {
    pub ok: bool,
    pub job_id: Option<i64>,
    pub reason: Option<String>,
}

pub const OFFER_UNAVAILABLE: &str = "offer unavailable";

impl AcceptOutcome {
    pub fn won(job_id: i64) -> Self {
        Self {
            ok: true,
            job_id: Some(job_id),
            reason: None,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            ok: false,
            job_id: None,
            reason: Some(OFFER_UNAVAILABLE.to_string()),
        }
    }
}
