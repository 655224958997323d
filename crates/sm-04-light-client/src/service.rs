//! # Light Client Tracker
//!
//! The solo machine's mirror of the counterparty's Tendermint light client,
//! persisted in a chain link's Merkle-committed `light-client` namespace:
//!
//! ```text
//! clientState                      tendermint ClientState
//! consensusStates/{rev}-{height}   tendermint ConsensusState
//! ```
//!
//! Writes are staged on the shared store; the caller commits them together
//! with whatever chain-link change the step produced.

use crate::domain::invariants::{invariant_consistent_at_height, invariant_non_decreasing};
use crate::domain::{HeaderOutcome, TrackerStatus};
use crate::ports::outbound::LightClientVerifier;
use prost::Message;
use shared_types::proto::tendermint::{ClientState, ConsensusState};
use shared_types::{CounterpartyHeader, Height, SoloMachineError, SoloResult};
use sm_01_protocol_store::{InclusionProof, Namespace};
use std::sync::Arc;
use tracing::{debug, info};

/// Key of the persisted client state.
pub const CLIENT_STATE_KEY: &str = "clientState";

/// Key of the consensus state at `height`.
pub fn consensus_state_key(height: Height) -> String {
    format!("consensusStates/{height}")
}

/// Mirrored light client of one chain link.
#[derive(Clone)]
pub struct LightClientTracker {
    ns: Namespace,
    client_id: String,
    verifier: Arc<dyn LightClientVerifier>,
}

impl LightClientTracker {
    /// Attach to the light client persisted in `ns`.
    ///
    /// A verifier that has not seen `client_id` yet is seeded from the
    /// persisted client state and latest consensus state.
    pub fn open(
        ns: Namespace,
        client_id: impl Into<String>,
        verifier: Arc<dyn LightClientVerifier>,
    ) -> SoloResult<Self> {
        let tracker = Self {
            ns,
            client_id: client_id.into(),
            verifier,
        };
        if let TrackerStatus::Initialized { latest_height } = tracker.status()? {
            if tracker.verifier.latest_height(&tracker.client_id).is_none() {
                let client_state = tracker.ns.require(CLIENT_STATE_KEY)?;
                let consensus_state = tracker.ns.require(consensus_state_key(latest_height))?;
                tracker
                    .verifier
                    .initialize(&tracker.client_id, &client_state, &consensus_state)
                    .map_err(|e| e.into_solo(&tracker.client_id, "restore-light-client"))?;
                debug!(client_id = %tracker.client_id, height = %latest_height, "verifier restored");
            }
        }
        Ok(tracker)
    }

    /// Local client identifier (`07-tendermint-<n>`).
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `Absent` until a client state is committed.
    pub fn status(&self) -> SoloResult<TrackerStatus> {
        match self.ns.get(CLIENT_STATE_KEY)? {
            None => Ok(TrackerStatus::Absent),
            Some(bytes) => Ok(TrackerStatus::Initialized {
                latest_height: decode_client_state(&bytes)?.latest(),
            }),
        }
    }

    /// Seed the mirror from a trusted client and consensus state.
    pub fn initialize(&self, client_state: &ClientState, consensus_state: &ConsensusState) -> SoloResult<()> {
        if let TrackerStatus::Initialized { latest_height } = self.status()? {
            return Err(SoloMachineError::protocol_state(
                &self.client_id,
                "initialize-light-client",
                format!("already initialized at height {latest_height}"),
            ));
        }
        let height = client_state.latest();
        if height.is_zero() {
            return Err(SoloMachineError::serialization(
                "client state has no latest height",
            ));
        }
        let cs_bytes = client_state.encode_to_vec();
        let cons_bytes = consensus_state.encode_to_vec();
        self.verifier
            .initialize(&self.client_id, &cs_bytes, &cons_bytes)
            .map_err(|e| e.into_solo(&self.client_id, "initialize-light-client"))?;
        self.ns.set(CLIENT_STATE_KEY, cs_bytes);
        self.ns.set(consensus_state_key(height), cons_bytes);
        info!(
            client_id = %self.client_id,
            chain_id = %client_state.chain_id,
            height = %height,
            "light client initialized"
        );
        Ok(())
    }

    /// Verify and adopt a counterparty header.
    pub fn apply_header(&self, header: &CounterpartyHeader) -> SoloResult<HeaderOutcome> {
        let step = "apply-header";
        let mut client_state = match self.ns.get(CLIENT_STATE_KEY)? {
            Some(bytes) => decode_client_state(&bytes)?,
            None => {
                return Err(SoloMachineError::protocol_state(
                    &self.client_id,
                    step,
                    "light client is not initialized",
                ))
            }
        };
        let incoming = header.consensus_state();

        if let Some(stored) = self.get_consensus_state(header.height)? {
            invariant_consistent_at_height(header.height, &stored, &incoming)
                .map_err(|reason| SoloMachineError::protocol_state(&self.client_id, step, reason))?;
            debug!(client_id = %self.client_id, height = %header.height, "header already known");
            return Ok(HeaderOutcome::Unchanged(header.height));
        }

        let latest = client_state.latest();
        invariant_non_decreasing(latest, header.height)
            .map_err(|reason| SoloMachineError::protocol_state(&self.client_id, step, reason))?;

        self.verifier
            .update_state(&self.client_id, header)
            .map_err(|e| e.into_solo(&self.client_id, step))?;

        let latest_height = latest.max(header.height);
        client_state.latest_height = Some(latest_height);
        self.ns.set(CLIENT_STATE_KEY, client_state.encode_to_vec());
        self.ns
            .set(consensus_state_key(header.height), incoming.encode_to_vec());
        info!(client_id = %self.client_id, height = %header.height, "light client updated");
        Ok(HeaderOutcome::Applied {
            height: header.height,
            latest_height,
        })
    }

    /// Committed client state; `NotFound` while absent.
    pub fn current_client_state(&self) -> SoloResult<ClientState> {
        decode_client_state(&self.ns.require(CLIENT_STATE_KEY)?)
    }

    /// Committed consensus state at `height`; `NotFound` if none.
    pub fn consensus_state_at(&self, height: Height) -> SoloResult<ConsensusState> {
        self.get_consensus_state(height)?.ok_or_else(|| {
            SoloMachineError::not_found(format!(
                "{}/{}",
                self.ns.name(),
                consensus_state_key(height)
            ))
        })
    }

    /// Inclusion proof of the consensus state at `height` under the store's
    /// commitment root.
    pub fn prove_consensus_state(&self, height: Height) -> SoloResult<(Vec<u8>, InclusionProof)> {
        self.ns.prove(consensus_state_key(height))
    }

    /// Heights of every committed consensus state, ascending.
    pub fn consensus_heights(&self) -> SoloResult<Vec<Height>> {
        let prefix = b"consensusStates/";
        let mut heights = Vec::new();
        for (key, _) in self.ns.entries()? {
            if let Some(rest) = key.strip_prefix(prefix.as_slice()) {
                let text = std::str::from_utf8(rest)
                    .map_err(|_| SoloMachineError::corrupted("consensus state key is not UTF-8"))?;
                heights.push(text.parse::<Height>()?);
            }
        }
        heights.sort();
        Ok(heights)
    }

    fn get_consensus_state(&self, height: Height) -> SoloResult<Option<ConsensusState>> {
        self.ns
            .get(consensus_state_key(height))?
            .map(|bytes| {
                ConsensusState::decode(bytes.as_slice())
                    .map_err(|e| SoloMachineError::corrupted(format!("consensus state at {height}: {e}")))
            })
            .transpose()
    }
}

fn decode_client_state(bytes: &[u8]) -> SoloResult<ClientState> {
    ClientState::decode(bytes).map_err(|e| SoloMachineError::corrupted(format!("client state: {e}")))
}

impl std::fmt::Debug for LightClientTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightClientTracker")
            .field("namespace", &self.ns.name())
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}
