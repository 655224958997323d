//! # Identity & Sequence Keeper (Subsystem 02)
//!
//! The single signing identity of a solo machine, the sequence counter every
//! signature consumes, and the per-counterparty chain-link records.
//!
//! ## Persisted Layout
//!
//! ```text
//! solo-machine/
//!   private-key          secp256k1 secret
//!   sequence             next sequence, big-endian u64
//! chains/<chain-name>/
//!   diversifier          15 x [a-z], immutable
//!   counterparty-client-id, client-id,
//!   counterparty-connection-id, connection-id,
//!   counterparty-ics20-channel-id, ics20-channel-id
//!   connection-state, channel-state
//!   next-packet-sequence
//!   next-light-client-number, next-connection-number, next-channel-number
//!   light-client/        merkle-committed, owned by subsystem 04
//! ```
//!
//! ## Invariants
//!
//! - A sequence value is committed before it is returned, so no value is
//!   ever signed twice across restarts.
//! - Chain-link identifiers are set in handshake order and never reassigned.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain_link;
pub mod domain;
pub mod keeper;

pub use chain_link::{ChainLinkStore, CHAINS_NAMESPACE, LIGHT_CLIENT_NAMESPACE};
pub use domain::{generate_diversifier, is_valid_diversifier, ChainLink, HandshakeStage, LinkField};
pub use keeper::{IdentityKeeper, SequenceSync, INITIAL_SEQUENCE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
