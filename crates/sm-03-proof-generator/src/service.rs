//! # Proof Generator Service
//!
//! One signing routine for every proof kind:
//!
//! ```text
//! SignBytes{sequence, now_ms, diversifier, path, data}  --protobuf-->  sign
//!   -> SignatureData{single{DIRECT, sig}}
//!   -> TimestampedSignatureData{signature_data, now_ms}  --protobuf-->  proof
//! ```
//!
//! Failures propagate unchanged. Nothing here retries.

use crate::algorithms::sign_bytes::encode_sign_bytes;
use crate::domain::payloads::{ProofKind, ProofPayload};
use crate::ports::outbound::{SystemTimeSource, TimeSource};
use prost::Message;
use shared_types::proto::cosmos::SignatureData;
use shared_types::proto::solomachine::{
    ClientState as SoloClientState, ConsensusState as SoloConsensusState, Header,
    TimestampedSignatureData,
};
use shared_types::SoloResult;
use sm_02_identity::IdentityKeeper;
use std::sync::Arc;
use tracing::debug;

/// A proof together with the sequence it consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedProof {
    /// What was proven
    pub kind: ProofKind,
    /// Sequence signed over
    pub sequence: u64,
    /// Timestamp signed over, in milliseconds
    pub timestamp: u64,
    /// Encoded `TimestampedSignatureData`
    pub proof: Vec<u8>,
}

/// A signed update header together with the sequence it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedHeader {
    /// Sequence signed over
    pub sequence: u64,
    /// The header
    pub header: Header,
}

/// Produces sequence-bound proofs for one chain link's diversifier.
#[derive(Clone)]
pub struct ProofGenerator {
    keeper: IdentityKeeper,
    diversifier: String,
    time: Arc<dyn TimeSource>,
}

impl ProofGenerator {
    /// Generator stamping proofs with system time.
    pub fn new(keeper: IdentityKeeper, diversifier: impl Into<String>) -> Self {
        Self::with_time_source(keeper, diversifier, Arc::new(SystemTimeSource))
    }

    /// Generator with an explicit time source.
    pub fn with_time_source(
        keeper: IdentityKeeper,
        diversifier: impl Into<String>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            keeper,
            diversifier: diversifier.into(),
            time,
        }
    }

    /// Diversifier every proof is bound to.
    pub fn diversifier(&self) -> &str {
        &self.diversifier
    }

    /// Identity the proofs are signed with.
    pub fn keeper(&self) -> &IdentityKeeper {
        &self.keeper
    }

    /// Current time in milliseconds.
    pub fn now_millis(&self) -> u64 {
        self.time.now_millis()
    }

    /// Sign `(sequence, now, diversifier, path, data)` and return the encoded
    /// envelope.
    pub fn build_proof(&self, sequence: u64, path: &[u8], data: &[u8]) -> SoloResult<Vec<u8>> {
        let timestamp = self.now_millis();
        let signature_data = self.sign(sequence, timestamp, path, data);
        Ok(TimestampedSignatureData {
            signature_data,
            timestamp,
        }
        .encode_to_vec())
    }

    /// Consume the next sequence from the keeper and prove `payload` at it.
    pub fn prove(&self, payload: &ProofPayload) -> SoloResult<SignedProof> {
        let sequence = self.keeper.next_sequence()?;
        let timestamp = self.now_millis();
        let signature_data = self.sign(sequence, timestamp, payload.path.as_bytes(), &payload.data);
        let proof = TimestampedSignatureData {
            signature_data,
            timestamp,
        }
        .encode_to_vec();
        debug!(kind = %payload.kind, sequence, path = %payload.path, "proof built");
        Ok(SignedProof {
            kind: payload.kind,
            sequence,
            timestamp,
            proof,
        })
    }

    /// Consume the next sequence and sign an update header that keeps the
    /// current key and diversifier.
    pub fn build_header(&self) -> SoloResult<SignedHeader> {
        let public_key = self.keeper.public_key_any();
        let payload = ProofPayload::header(&public_key, &self.diversifier);
        let sequence = self.keeper.next_sequence()?;
        let timestamp = self.now_millis();
        let signature = self.sign(sequence, timestamp, payload.path.as_bytes(), &payload.data);
        debug!(sequence, timestamp, "header signed");
        Ok(SignedHeader {
            sequence,
            header: Header {
                timestamp,
                signature,
                new_public_key: Some(public_key),
                new_diversifier: self.diversifier.clone(),
            },
        })
    }

    /// Consensus state the counterparty's solo-machine client verifies
    /// against, stamped now.
    pub fn consensus_state(&self) -> SoloConsensusState {
        SoloConsensusState {
            public_key: Some(self.keeper.public_key_any()),
            diversifier: self.diversifier.clone(),
            timestamp: self.now_millis(),
        }
    }

    /// Client state for `CreateClient`, starting at the keeper's current
    /// sequence.
    pub fn client_state(&self) -> SoloResult<SoloClientState> {
        Ok(SoloClientState {
            sequence: self.keeper.current_sequence()?,
            is_frozen: false,
            consensus_state: Some(self.consensus_state()),
        })
    }

    /// Encoded `SignatureData{single{DIRECT, signature}}` over the sign bytes.
    fn sign(&self, sequence: u64, timestamp: u64, path: &[u8], data: &[u8]) -> Vec<u8> {
        let bytes = encode_sign_bytes(sequence, timestamp, &self.diversifier, path, data);
        debug!(sequence, sign_bytes = %hex::encode(&bytes), "signing");
        SignatureData::direct(self.keeper.sign(&bytes)).encode_to_vec()
    }
}

impl std::fmt::Debug for ProofGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofGenerator")
            .field("diversifier", &self.diversifier)
            .finish_non_exhaustive()
    }
}
