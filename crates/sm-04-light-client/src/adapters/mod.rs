//! Verifier adapters.

pub mod lineage;

pub use lineage::LineageVerifier;
