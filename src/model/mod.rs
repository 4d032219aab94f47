mod assignment;
mod offer;
mod state;

pub use assignment::{
    AcceptOutcome, AvailabilityBlock, BUSY_STATE, DISPATCH_SOURCE, JobAssignment,
    OFFER_UNAVAILABLE,
};
pub use offer::{JobOffer, OfferBatch};
pub use state::{AssignmentStatus, OfferStatus};
