//! Ports of the orchestrator.

pub mod inbound;
pub mod outbound;

pub use inbound::HandshakeApi;
pub use outbound::{ChainClient, MockChainClient};
