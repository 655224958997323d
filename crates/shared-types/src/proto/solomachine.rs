//! `ibc.lightclients.solomachine.v3` messages.

use super::google::Any;
use super::TypeUrl;

/// Path signed over when producing an update header.
pub const SENTINEL_HEADER_PATH: &str = "solomachine:header";

/// Solo-machine client state as stored on the counterparty.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ClientState {
    /// Latest sequence accepted by the client
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(bool, tag = "2")]
    pub is_frozen: bool,
    #[prost(message, optional, tag = "3")]
    pub consensus_state: Option<ConsensusState>,
}

impl TypeUrl for ClientState {
    const TYPE_URL: &'static str = "/ibc.lightclients.solomachine.v3.ClientState";
}

/// Public key, diversifier and timestamp the counterparty verifies against.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ConsensusState {
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Any>,
    #[prost(string, tag = "2")]
    pub diversifier: String,
    #[prost(uint64, tag = "3")]
    pub timestamp: u64,
}

impl TypeUrl for ConsensusState {
    const TYPE_URL: &'static str = "/ibc.lightclients.solomachine.v3.ConsensusState";
}

/// Update header; its signature covers [`SignBytes`] over [`HeaderData`].
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Header {
    #[prost(uint64, tag = "1")]
    pub timestamp: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub new_public_key: Option<Any>,
    #[prost(string, tag = "4")]
    pub new_diversifier: String,
}

impl TypeUrl for Header {
    const TYPE_URL: &'static str = "/ibc.lightclients.solomachine.v3.Header";
}

/// Envelope every proof is serialized as.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TimestampedSignatureData {
    /// Encoded `SignatureDescriptor.Data`
    #[prost(bytes = "vec", tag = "1")]
    pub signature_data: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub timestamp: u64,
}

/// The exact bytes a solo machine signs.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SignBytes {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(uint64, tag = "2")]
    pub timestamp: u64,
    #[prost(string, tag = "3")]
    pub diversifier: String,
    #[prost(bytes = "vec", tag = "4")]
    pub path: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub data: Vec<u8>,
}

/// Data signed over by an update header.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct HeaderData {
    #[prost(message, optional, tag = "1")]
    pub new_pub_key: Option<Any>,
    #[prost(string, tag = "2")]
    pub new_diversifier: String,
}
