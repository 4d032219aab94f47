//! Competitive job offers for field surveyors.
//!
//! A claim (FNOL) is offered to several surveyors at once; the first one to
//! accept wins the job and every other offer in the group is closed. The
//! winner gets a job assignment and a busy block on their calendar in the
//! same database transaction as the acceptance itself.

pub mod availability;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod store;

pub use availability::{AvailabilityWriter, SqliteAvailability};
pub use config::DispatchConfig;
pub use dispatch::{Dispatcher, RaceReport, race_offer};
pub use error::{DispatchError, FailureKind};
pub use model::{
    AcceptOutcome, AssignmentStatus, AvailabilityBlock, JobAssignment, JobOffer, OfferBatch,
    OfferStatus,
};
pub use store::Store;
