//! # Solo-Machine Test Suite
//!
//! Cross-subsystem flows: store, identity, proofs, mirrored light client and
//! orchestrator wired together against the crate-provided
//! `MockChainClient`.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs         # Machine fixture, recording chain client
//!     ├── handshake_flow.rs  # Stages, ack bundle, transfer, update
//!     ├── proofs.rs          # Proof verification and tampering
//!     └── restart.rs         # Durable sequences and resumption
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sm-tests
//! cargo test -p sm-tests integration::restart::
//! ```

#![allow(dead_code)]

pub mod integration;
