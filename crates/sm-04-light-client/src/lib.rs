//! # Mirrored Light-Client Tracker (Subsystem 04)
//!
//! The solo machine's local emulation of the counterparty chain's Tendermint
//! light client. Its client and consensus states are what the connection-ack
//! client and consensus proofs attest to.
//!
//! ## Module Structure
//!
//! ```text
//! sm-04-light-client/
//! ├── domain/       # TrackerStatus, HeaderOutcome, VerificationError, invariants
//! ├── algorithms/   # Client-state construction (trusting period, proof specs)
//! ├── ports/        # LightClientVerifier (outbound) + MockVerifier
//! ├── adapters/     # LineageVerifier
//! ├── service.rs    # LightClientTracker
//! └── config.rs     # LightClientConfig
//! ```
//!
//! ## Lifecycle
//!
//! `Absent -> Initialized`, one-way. Headers are applied at non-decreasing
//! heights; a known height is never rewritten with different content.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::LineageVerifier;
pub use algorithms::{build_client_state, trusting_period, UPGRADE_PATH};
pub use config::LightClientConfig;
pub use domain::{HeaderOutcome, TrackerStatus, VerificationError};
pub use ports::{LightClientVerifier, MockVerifier};
pub use service::{consensus_state_key, LightClientTracker, CLIENT_STATE_KEY};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
