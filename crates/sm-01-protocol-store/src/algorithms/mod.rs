//! Algorithms for the Protocol Store.

pub mod merkle;

pub use merkle::{compute_root, leaf_hash, verify_inclusion, InclusionProof, Position, ProofNode};
