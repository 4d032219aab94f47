use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Lifecycle of a single per-surveyor offer.
///
/// Every offer starts `Pending` and moves at most once:
/// PENDING → ACCEPTED | CLOSED | EXPIRED. The other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Closed,
    Expired,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Closed => "CLOSED",
            OfferStatus::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OfferStatus::Pending)
    }

    /// Whether `self → next` is a legal move. Only `Pending` may leave.
    pub fn can_transition_to(&self, next: OfferStatus) -> bool {
        matches!(
            (self, next),
            (
                OfferStatus::Pending,
                OfferStatus::Accepted | OfferStatus::Closed | OfferStatus::Expired
            )
        )
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for OfferStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OfferStatus::Pending),
            "ACCEPTED" => Ok(OfferStatus::Accepted),
            "CLOSED" => Ok(OfferStatus::Closed),
            "EXPIRED" => Ok(OfferStatus::Expired),
            other => Err(DispatchError::Corrupt(format!("unknown offer status {other:?}"))),
        }
    }
}

/// Lifecycle of a job assignment: ASSIGNED → COMPLETED | CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Assigned,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "ASSIGNED",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AssignmentStatus::Assigned)
    }

    pub fn can_transition_to(&self, next: AssignmentStatus) -> bool {
        matches!(
            (self, next),
            (
                AssignmentStatus::Assigned,
                AssignmentStatus::Completed | AssignmentStatus::Cancelled
            )
        )
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASSIGNED" => Ok(AssignmentStatus::Assigned),
            "COMPLETED" => Ok(AssignmentStatus::Completed),
            "CANCELLED" => Ok(AssignmentStatus::Cancelled),
            other => Err(DispatchError::Corrupt(format!(
                "unknown assignment status {other:?}"
            ))),
        }
    }
}
