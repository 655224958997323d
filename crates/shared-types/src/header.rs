//! Counterparty headers pulled into the mirrored light client.

use crate::height::Height;
use crate::proto::google::Timestamp;
use crate::proto::ibc::MerkleRoot;
use crate::proto::tendermint::ConsensusState;
use serde::{Deserialize, Serialize};

/// A signed header from the counterparty chain.
///
/// Only the fields the solo machine needs are decoded; `raw` carries the
/// full encoded header for the light-client verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyHeader {
    /// Chain id the header was produced by.
    pub chain_id: String,
    /// Height of this header.
    pub height: Height,
    /// Height of the consensus state this header is verified against.
    pub trusted_height: Height,
    /// Block time in unix nanoseconds.
    pub timestamp_nanos: u64,
    /// Application state root committed by the block.
    #[serde(with = "hex::serde")]
    pub app_hash: Vec<u8>,
    /// Hash of the validator set for the next block.
    #[serde(with = "hex::serde")]
    pub next_validators_hash: Vec<u8>,
    /// Encoded header as produced by the counterparty.
    #[serde(with = "hex::serde", default)]
    pub raw: Vec<u8>,
}

impl CounterpartyHeader {
    /// Consensus state this header commits to.
    pub fn consensus_state(&self) -> ConsensusState {
        ConsensusState {
            timestamp: Some(Timestamp::from_unix_nanos(self.timestamp_nanos)),
            root: Some(MerkleRoot {
                hash: self.app_hash.clone(),
            }),
            next_validators_hash: self.next_validators_hash.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_uses_hex_bytes() {
        let header = CounterpartyHeader {
            chain_id: "testchain-1".into(),
            height: Height::new(1, 10),
            trusted_height: Height::new(1, 9),
            timestamp_nanos: 5,
            app_hash: vec![0xab, 0xcd],
            next_validators_hash: vec![0x01],
            raw: Vec::new(),
        };
        let json = serde_json::to_string(&header).unwrap();
        assert!(json.contains("\"abcd\""));
        let back: CounterpartyHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(back, header);
        assert_eq!(back.consensus_state().root.unwrap().hash, vec![0xab, 0xcd]);
    }
}
