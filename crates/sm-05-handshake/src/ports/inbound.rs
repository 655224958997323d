//! # Inbound Ports
//!
//! What the orchestrator offers its callers.

use crate::domain::{LinkStatus, RefreshOutcome, TransferReceipt, TransferRequest};
use async_trait::async_trait;
use shared_types::SoloResult;
use sm_02_identity::ChainLink;

/// Handshake API - inbound port.
#[async_trait]
pub trait HandshakeApi: Send + Sync {
    /// Drive clients, connection and channel to open, resuming wherever a
    /// previous run stopped.
    async fn link(&self) -> SoloResult<ChainLink>;

    /// Push a header to the counterparty and pull one into the mirror.
    async fn update(&self) -> SoloResult<RefreshOutcome>;

    /// Send an ICS-20 transfer over the open channel.
    async fn transfer(&self, request: &TransferRequest) -> SoloResult<TransferReceipt>;

    /// Local records next to the counterparty's view.
    async fn status(&self) -> SoloResult<LinkStatus>;
}
