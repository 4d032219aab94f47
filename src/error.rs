use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Offer not found: group {offer_group}, surveyor {surveyor_id}")]
    OfferNotFound { offer_group: String, surveyor_id: i64 },

    #[error("Offer {0} has expired")]
    OfferExpired(String),

    #[error("Offer {0} has already been taken")]
    OfferAlreadyTaken(String),

    #[error("Job assignment not found: {0}")]
    AssignmentNotFound(i64),

    #[error("Job assignment {job_id} is already {status}")]
    AssignmentTerminal { job_id: i64, status: String },

    #[error("Availability error: {0}")]
    Availability(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DispatchError {
    /// Expected business outcomes are `Business`; anything that means the
    /// request itself could not be served is `System`.
    pub fn kind(&self) -> FailureKind {
        match self {
            DispatchError::Validation(_)
            | DispatchError::OfferNotFound { .. }
            | DispatchError::OfferExpired(_)
            | DispatchError::OfferAlreadyTaken(_)
            | DispatchError::AssignmentNotFound(_)
            | DispatchError::AssignmentTerminal { .. } => FailureKind::Business,
            DispatchError::Availability(_)
            | DispatchError::Corrupt(_)
            | DispatchError::Task(_)
            | DispatchError::Config(_)
            | DispatchError::Storage(_)
            | DispatchError::Io(_)
            | DispatchError::Json(_)
            | DispatchError::Toml(_) => FailureKind::System,
        }
    }

    /// True for the causes a losing acceptance collapses into "offer unavailable".
    pub fn is_offer_unavailable(&self) -> bool {
        matches!(
            self,
            DispatchError::OfferNotFound { .. }
                | DispatchError::OfferExpired(_)
                | DispatchError::OfferAlreadyTaken(_)
        )
    }
}

/// Classifies a dispatch failure for callers deciding whether to surface or alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// Expected outcome (lost race, expiry, bad input).
    Business,
    /// Infrastructure failure (database, filesystem, config).
    System,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Business => write!(f, "Business"),
            FailureKind::System => write!(f, "System"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_causes_are_business_failures() {
        let errors = [
            DispatchError::OfferNotFound {
                offer_group: "g1".into(),
                surveyor_id: 7,
            },
            DispatchError::OfferExpired("g1".into()),
            DispatchError::OfferAlreadyTaken("g1".into()),
        ];
        for err in errors {
            assert!(err.is_offer_unavailable());
            assert_eq!(err.kind(), FailureKind::Business);
        }
    }

    #[test]
    fn storage_errors_are_system_failures() {
        let err = DispatchError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.kind(), FailureKind::System);
        assert!(!err.is_offer_unavailable());
    }

    #[test]
    fn error_display() {
        let err = DispatchError::AssignmentTerminal {
            job_id: 55,
            status: "COMPLETED".into(),
        };
        assert_eq!(err.to_string(), "Job assignment 55 is already COMPLETED");

        let err = DispatchError::OfferNotFound {
            offer_group: "g1".into(),
            surveyor_id: 4,
        };
        assert_eq!(err.to_string(), "Offer not found: group g1, surveyor 4");
    }

    #[test]
    fn failure_kind_display() {
        assert_eq!(FailureKind::Business.to_string(), "Business");
        assert_eq!(FailureKind::System.to_string(), "System");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DispatchError>();
    }
}
