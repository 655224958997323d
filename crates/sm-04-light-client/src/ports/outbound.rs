//! # Outbound Ports
//!
//! Consensus verification of counterparty headers is delegated to a
//! [`LightClientVerifier`].

use crate::domain::VerificationError;
use parking_lot::Mutex;
use prost::Message;
use shared_types::proto::tendermint::ClientState;
use shared_types::{CounterpartyHeader, Height};
use std::collections::HashMap;

/// Light-client verifier - outbound port.
///
/// State bytes are protobuf encodings of the Tendermint `ClientState` and
/// `ConsensusState` messages.
pub trait LightClientVerifier: Send + Sync {
    /// Start tracking `client_id` from a trusted client and consensus state.
    fn initialize(
        &self,
        client_id: &str,
        client_state: &[u8],
        consensus_state: &[u8],
    ) -> Result<(), VerificationError>;

    /// Verify `header` against held state and adopt it on success.
    fn update_state(&self, client_id: &str, header: &CounterpartyHeader) -> Result<(), VerificationError>;

    /// Latest verified height, `None` if the client is unknown.
    fn latest_height(&self, client_id: &str) -> Option<Height>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock verifier for testing: accepts everything unless told otherwise.
#[derive(Debug, Default)]
pub struct MockVerifier {
    heights: Mutex<HashMap<String, Height>>,
    reject_updates: Mutex<Option<VerificationError>>,
    updates: Mutex<Vec<(String, Height)>>,
}

impl MockVerifier {
    /// Create an accepting verifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent update with `error`.
    pub fn reject_updates_with(&self, error: VerificationError) {
        *self.reject_updates.lock() = Some(error);
    }

    /// Accept updates again.
    pub fn accept_updates(&self) {
        *self.reject_updates.lock() = None;
    }

    /// Every accepted `(client_id, height)` in order.
    pub fn updates(&self) -> Vec<(String, Height)> {
        self.updates.lock().clone()
    }
}

impl LightClientVerifier for MockVerifier {
    fn initialize(
        &self,
        client_id: &str,
        client_state: &[u8],
        _consensus_state: &[u8],
    ) -> Result<(), VerificationError> {
        let cs = ClientState::decode(client_state)
            .map_err(|e| VerificationError::Malformed(e.to_string()))?;
        self.heights.lock().insert(client_id.to_string(), cs.latest());
        Ok(())
    }

    fn update_state(&self, client_id: &str, header: &CounterpartyHeader) -> Result<(), VerificationError> {
        if let Some(error) = self.reject_updates.lock().clone() {
            return Err(error);
        }
        let mut heights = self.heights.lock();
        let latest = heights
            .get_mut(client_id)
            .ok_or_else(|| VerificationError::NotInitialized {
                client_id: client_id.to_string(),
            })?;
        *latest = (*latest).max(header.height);
        self.updates
            .lock()
            .push((client_id.to_string(), header.height));
        Ok(())
    }

    fn latest_height(&self, client_id: &str) -> Option<Height> {
        self.heights.lock().get(client_id).copied()
    }
}
