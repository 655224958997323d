//! Domain layer for the mirrored light client.

pub mod entities;
pub mod errors;
pub mod invariants;

pub use entities::{HeaderOutcome, TrackerStatus};
pub use errors::VerificationError;
pub use invariants::{invariant_consistent_at_height, invariant_non_decreasing};
