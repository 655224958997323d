//! # Handshake Configuration

use crate::algorithms::RetryPolicy;
use serde::{Deserialize, Serialize};
use shared_types::{SoloMachineError, SoloResult};
use sm_04_light_client::LightClientConfig;

/// Blocks past the mirrored latest height after which a packet times out.
pub const DEFAULT_TRANSFER_TIMEOUT_BLOCKS: u64 = 1000;

/// Orchestrator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Packet timeout offset in counterparty blocks.
    pub transfer_timeout_blocks: u64,
    /// Parameters of the mirrored light client.
    pub light_client: LightClientConfig,
    /// Transaction confirmation polling.
    pub confirmation: RetryPolicy,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            transfer_timeout_blocks: DEFAULT_TRANSFER_TIMEOUT_BLOCKS,
            light_client: LightClientConfig::default(),
            confirmation: RetryPolicy::default(),
        }
    }
}

impl HandshakeConfig {
    /// Create a config for testing (fast polling).
    pub fn for_testing() -> Self {
        Self {
            transfer_timeout_blocks: DEFAULT_TRANSFER_TIMEOUT_BLOCKS,
            light_client: LightClientConfig::for_testing(),
            confirmation: RetryPolicy::for_testing(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> SoloResult<()> {
        if self.transfer_timeout_blocks == 0 {
            return Err(SoloMachineError::Configuration {
                message: "transfer_timeout_blocks must be positive".to_string(),
            });
        }
        self.light_client
            .validate()
            .map_err(|message| SoloMachineError::Configuration { message })?;
        self.confirmation.validate()
    }
}
