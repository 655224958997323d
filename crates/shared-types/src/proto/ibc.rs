//! # IBC Core Messages
//!
//! Connection ends, channel ends, commitment prefixes and packets.
//!
//! State enums also render as the upstream proto names (`STATE_OPEN`, ...),
//! which is how the solo machine persists them.

use crate::errors::SoloMachineError;
use crate::height::Height;

/// Store key all IBC paths live under on the counterparty.
pub const IBC_STORE_KEY: &str = "ibc";

/// `ibc.core.connection.v1.State`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ConnectionState {
    UninitializedUnspecified = 0,
    Init = 1,
    Tryopen = 2,
    Open = 3,
}

impl ConnectionState {
    /// Upstream proto name.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            ConnectionState::UninitializedUnspecified => "STATE_UNINITIALIZED_UNSPECIFIED",
            ConnectionState::Init => "STATE_INIT",
            ConnectionState::Tryopen => "STATE_TRYOPEN",
            ConnectionState::Open => "STATE_OPEN",
        }
    }

    /// Parse an upstream proto name.
    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "STATE_UNINITIALIZED_UNSPECIFIED" => Some(ConnectionState::UninitializedUnspecified),
            "STATE_INIT" => Some(ConnectionState::Init),
            "STATE_TRYOPEN" => Some(ConnectionState::Tryopen),
            "STATE_OPEN" => Some(ConnectionState::Open),
            _ => None,
        }
    }
}

/// `ibc.core.channel.v1.State`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ChannelState {
    UninitializedUnspecified = 0,
    Init = 1,
    Tryopen = 2,
    Open = 3,
    Closed = 4,
}

impl ChannelState {
    /// Upstream proto name.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            ChannelState::UninitializedUnspecified => "STATE_UNINITIALIZED_UNSPECIFIED",
            ChannelState::Init => "STATE_INIT",
            ChannelState::Tryopen => "STATE_TRYOPEN",
            ChannelState::Open => "STATE_OPEN",
            ChannelState::Closed => "STATE_CLOSED",
        }
    }

    /// Parse an upstream proto name.
    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "STATE_UNINITIALIZED_UNSPECIFIED" => Some(ChannelState::UninitializedUnspecified),
            "STATE_INIT" => Some(ChannelState::Init),
            "STATE_TRYOPEN" => Some(ChannelState::Tryopen),
            "STATE_OPEN" => Some(ChannelState::Open),
            "STATE_CLOSED" => Some(ChannelState::Closed),
            _ => None,
        }
    }
}

/// `ibc.core.channel.v1.Order`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Order {
    NoneUnspecified = 0,
    Unordered = 1,
    Ordered = 2,
}

/// `ibc.core.commitment.v1.MerklePrefix`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct MerklePrefix {
    #[prost(bytes = "vec", tag = "1")]
    pub key_prefix: Vec<u8>,
}

impl MerklePrefix {
    /// Prefix of the counterparty's IBC store.
    pub fn ibc() -> Self {
        Self {
            key_prefix: IBC_STORE_KEY.as_bytes().to_vec(),
        }
    }
}

/// `ibc.core.commitment.v1.MerkleRoot`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct MerkleRoot {
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
}

/// `ibc.core.connection.v1.Version`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Version {
    #[prost(string, tag = "1")]
    pub identifier: String,
    #[prost(string, repeated, tag = "2")]
    pub features: Vec<String>,
}

impl Version {
    /// The single connection version IBC currently defines.
    pub fn default_version() -> Self {
        Self {
            identifier: "1".to_string(),
            features: vec!["ORDER_ORDERED".to_string(), "ORDER_UNORDERED".to_string()],
        }
    }
}

/// `ibc.core.connection.v1.Counterparty`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ConnectionCounterparty {
    #[prost(string, tag = "1")]
    pub client_id: String,
    #[prost(string, tag = "2")]
    pub connection_id: String,
    #[prost(message, optional, tag = "3")]
    pub prefix: Option<MerklePrefix>,
}

/// `ibc.core.connection.v1.ConnectionEnd`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ConnectionEnd {
    #[prost(string, tag = "1")]
    pub client_id: String,
    #[prost(message, repeated, tag = "2")]
    pub versions: Vec<Version>,
    #[prost(enumeration = "ConnectionState", tag = "3")]
    pub state: i32,
    #[prost(message, optional, tag = "4")]
    pub counterparty: Option<ConnectionCounterparty>,
    #[prost(uint64, tag = "5")]
    pub delay_period: u64,
}

impl ConnectionEnd {
    /// Decoded state; unknown values are an error rather than a silent default.
    pub fn connection_state(&self) -> Result<ConnectionState, SoloMachineError> {
        ConnectionState::try_from(self.state).map_err(|_| {
            SoloMachineError::serialization(format!("unknown connection state {}", self.state))
        })
    }
}

/// `ibc.core.channel.v1.Counterparty`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ChannelCounterparty {
    #[prost(string, tag = "1")]
    pub port_id: String,
    #[prost(string, tag = "2")]
    pub channel_id: String,
}

/// `ibc.core.channel.v1.Channel`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ChannelEnd {
    #[prost(enumeration = "ChannelState", tag = "1")]
    pub state: i32,
    #[prost(enumeration = "Order", tag = "2")]
    pub ordering: i32,
    #[prost(message, optional, tag = "3")]
    pub counterparty: Option<ChannelCounterparty>,
    #[prost(string, repeated, tag = "4")]
    pub connection_hops: Vec<String>,
    #[prost(string, tag = "5")]
    pub version: String,
}

impl ChannelEnd {
    /// Decoded state; unknown values are an error rather than a silent default.
    pub fn channel_state(&self) -> Result<ChannelState, SoloMachineError> {
        ChannelState::try_from(self.state).map_err(|_| {
            SoloMachineError::serialization(format!("unknown channel state {}", self.state))
        })
    }
}

/// `ibc.core.channel.v1.Packet`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Packet {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(string, tag = "2")]
    pub source_port: String,
    #[prost(string, tag = "3")]
    pub source_channel: String,
    #[prost(string, tag = "4")]
    pub destination_port: String,
    #[prost(string, tag = "5")]
    pub destination_channel: String,
    #[prost(bytes = "vec", tag = "6")]
    pub data: Vec<u8>,
    #[prost(message, optional, tag = "7")]
    pub timeout_height: Option<Height>,
    #[prost(uint64, tag = "8")]
    pub timeout_timestamp: u64,
}
