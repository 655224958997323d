//! # Handshake & Transfer Orchestrator (Subsystem 05)
//!
//! Turns a solo-machine identity and one chain link into an open ICS-20
//! channel against a Tendermint-based counterparty, and sends fungible
//! token packets over it.
//!
//! ## Module Structure
//!
//! ```text
//! sm-05-handshake/
//! ├── domain/       # Ack messages, transfer request/receipt, link status
//! ├── algorithms/   # Confirmation polling (RetryPolicy)
//! ├── ports/        # HandshakeApi (inbound), ChainClient + MockChainClient (outbound)
//! ├── service.rs    # HandshakeService
//! └── config.rs     # HandshakeConfig
//! ```
//!
//! ## Sequence Discipline
//!
//! Before every header or proof bundle the local counter is aligned with the
//! sequence the counterparty's solo-machine client expects next. A bundle's
//! proofs are then signed at consecutive sequences from that value.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use algorithms::{wait_for_confirmation, RetryPolicy};
pub use config::{HandshakeConfig, DEFAULT_TRANSFER_TIMEOUT_BLOCKS};
pub use domain::{
    ChannelOpenAck, ConnectionOpenAck, LinkStatus, RefreshOutcome, TransferReceipt,
    TransferRequest,
};
pub use ports::{ChainClient, HandshakeApi, MockChainClient};
pub use service::HandshakeService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
