//! # Lineage Verifier
//!
//! Default [`LightClientVerifier`]: checks that each header extends a held
//! consensus state of the same chain within the trusting period. Commit
//! signatures and validator-set transitions are not checked.

use crate::domain::VerificationError;
use crate::ports::outbound::LightClientVerifier;
use parking_lot::RwLock;
use prost::Message;
use shared_types::proto::tendermint::{ClientState, ConsensusState};
use shared_types::{CounterpartyHeader, Height};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug)]
struct Lineage {
    chain_id: String,
    trusting_period_nanos: u64,
    latest_height: Height,
    /// Block time (unix nanoseconds) per verified height.
    times: BTreeMap<Height, u64>,
}

/// In-memory lineage checker, one lineage per client id.
#[derive(Debug, Default)]
pub struct LineageVerifier {
    clients: RwLock<HashMap<String, Lineage>>,
}

impl LineageVerifier {
    /// Create an empty verifier.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LightClientVerifier for LineageVerifier {
    fn initialize(
        &self,
        client_id: &str,
        client_state: &[u8],
        consensus_state: &[u8],
    ) -> Result<(), VerificationError> {
        let cs = ClientState::decode(client_state)
            .map_err(|e| VerificationError::Malformed(format!("client state: {e}")))?;
        let cons = ConsensusState::decode(consensus_state)
            .map_err(|e| VerificationError::Malformed(format!("consensus state: {e}")))?;
        let latest_height = cs.latest();
        if latest_height.is_zero() {
            return Err(VerificationError::Malformed(
                "client state has no latest height".to_string(),
            ));
        }
        let trusting_period = cs
            .trusting_period
            .map(|d| d.to_std())
            .unwrap_or_default();
        let time = cons.timestamp.map(|t| t.to_unix_nanos()).unwrap_or(0);

        let mut clients = self.clients.write();
        if clients.contains_key(client_id) {
            return Err(VerificationError::AlreadyInitialized {
                client_id: client_id.to_string(),
            });
        }
        clients.insert(
            client_id.to_string(),
            Lineage {
                chain_id: cs.chain_id,
                trusting_period_nanos: u64::try_from(trusting_period.as_nanos()).unwrap_or(u64::MAX),
                latest_height,
                times: BTreeMap::from([(latest_height, time)]),
            },
        );
        debug!(client_id, height = %latest_height, "lineage initialized");
        Ok(())
    }

    fn update_state(&self, client_id: &str, header: &CounterpartyHeader) -> Result<(), VerificationError> {
        let mut clients = self.clients.write();
        let lineage = clients
            .get_mut(client_id)
            .ok_or_else(|| VerificationError::NotInitialized {
                client_id: client_id.to_string(),
            })?;

        if header.chain_id != lineage.chain_id {
            return Err(VerificationError::ChainIdMismatch {
                expected: lineage.chain_id.clone(),
                actual: header.chain_id.clone(),
            });
        }
        let trusted_time = *lineage.times.get(&header.trusted_height).ok_or(
            VerificationError::UnknownTrustedHeight {
                height: header.trusted_height,
            },
        )?;
        if header.height <= header.trusted_height {
            return Err(VerificationError::NonIncreasingHeight {
                trusted: header.trusted_height,
                header: header.height,
            });
        }
        if header.timestamp_nanos <= trusted_time {
            return Err(VerificationError::NonIncreasingTime {
                trusted_time_nanos: trusted_time,
                header_time_nanos: header.timestamp_nanos,
            });
        }
        if header.timestamp_nanos - trusted_time >= lineage.trusting_period_nanos {
            return Err(VerificationError::TrustingPeriodExpired {
                trusted: header.trusted_height,
                header_time_nanos: header.timestamp_nanos,
            });
        }

        lineage.times.insert(header.height, header.timestamp_nanos);
        lineage.latest_height = lineage.latest_height.max(header.height);
        debug!(client_id, height = %header.height, "header verified");
        Ok(())
    }

    fn latest_height(&self, client_id: &str) -> Option<Height> {
        self.clients.read().get(client_id).map(|l| l.latest_height)
    }
}
