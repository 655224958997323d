//! `ibc.lightclients.tendermint.v1` client and consensus state.

use super::google::{Duration, Timestamp};
use super::ibc::MerkleRoot;
use super::ics23::ProofSpec;
use super::TypeUrl;
use crate::height::Height;

/// `ibc.lightclients.tendermint.v1.Fraction`
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct Fraction {
    #[prost(uint64, tag = "1")]
    pub numerator: u64,
    #[prost(uint64, tag = "2")]
    pub denominator: u64,
}

impl Fraction {
    /// The default light-client trust level.
    pub fn one_third() -> Self {
        Self {
            numerator: 1,
            denominator: 3,
        }
    }
}

/// Tendermint light-client state mirrored by the solo machine.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ClientState {
    #[prost(string, tag = "1")]
    pub chain_id: String,
    #[prost(message, optional, tag = "2")]
    pub trust_level: Option<Fraction>,
    #[prost(message, optional, tag = "3")]
    pub trusting_period: Option<Duration>,
    #[prost(message, optional, tag = "4")]
    pub unbonding_period: Option<Duration>,
    #[prost(message, optional, tag = "5")]
    pub max_clock_drift: Option<Duration>,
    #[prost(message, optional, tag = "6")]
    pub frozen_height: Option<Height>,
    #[prost(message, optional, tag = "7")]
    pub latest_height: Option<Height>,
    #[prost(message, repeated, tag = "8")]
    pub proof_specs: Vec<ProofSpec>,
    #[prost(string, repeated, tag = "9")]
    pub upgrade_path: Vec<String>,
    #[prost(bool, tag = "10")]
    pub allow_update_after_expiry: bool,
    #[prost(bool, tag = "11")]
    pub allow_update_after_misbehaviour: bool,
}

impl TypeUrl for ClientState {
    const TYPE_URL: &'static str = "/ibc.lightclients.tendermint.v1.ClientState";
}

impl ClientState {
    /// Latest height, zero when unset.
    pub fn latest(&self) -> Height {
        self.latest_height.unwrap_or_else(Height::zero)
    }

    /// True when the client was frozen for misbehaviour.
    pub fn is_frozen(&self) -> bool {
        self.frozen_height.map(|h| !h.is_zero()).unwrap_or(false)
    }
}

/// Tendermint consensus state at one height.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ConsensusState {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "2")]
    pub root: Option<MerkleRoot>,
    #[prost(bytes = "vec", tag = "3")]
    pub next_validators_hash: Vec<u8>,
}

impl TypeUrl for ConsensusState {
    const TYPE_URL: &'static str = "/ibc.lightclients.tendermint.v1.ConsensusState";
}
