//! # Proof Generator (Subsystem 03)
//!
//! Produces the signed, sequence-bound proofs an IBC counterparty's
//! solo-machine client accepts in place of Merkle proofs.
//!
//! ## Proof Kinds
//!
//! | Kind | Path | Data |
//! |------|------|------|
//! | Connection TRYOPEN | `connections/{id}` | `ConnectionEnd` |
//! | Client state | `clients/{id}/clientState` | `Any(tendermint ClientState)` |
//! | Consensus state | `clients/{id}/consensusStates/{rev}-{h}` | `Any(tendermint ConsensusState)` |
//! | Channel TRYOPEN | `channelEnds/ports/{port}/channels/{id}` | `Channel` |
//! | Packet commitment | `commitments/ports/{port}/channels/{id}/sequences/{seq}` | commitment hash |
//! | Header | `solomachine:header` | `HeaderData` |
//!
//! All kinds go through [`ProofGenerator::build_proof`] or
//! [`ProofGenerator::prove`]; the routine does not know which kind it signs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

pub use algorithms::{decode_proof, encode_sign_bytes, verify_proof, verify_signature};
pub use domain::{ProofKind, ProofPayload};
pub use ports::{MockTimeSource, SystemTimeSource, TimeSource};
pub use service::{ProofGenerator, SignedHeader, SignedProof};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
