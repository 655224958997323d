//! Domain layer for proof generation.

pub mod payloads;

pub use payloads::{ProofKind, ProofPayload};
