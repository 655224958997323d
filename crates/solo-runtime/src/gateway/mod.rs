//! # Gateway Chain Client
//!
//! [`ChainClient`](sm_05_handshake::ChainClient) over a per-chain JSON-RPC
//! gateway that owns the counterparty's keyring, fee and broadcast plumbing.

pub mod client;
pub mod transport;
pub mod types;

pub use client::GatewayChainClient;
pub use transport::{GatewayError, GatewayTransport, HttpTransport};
