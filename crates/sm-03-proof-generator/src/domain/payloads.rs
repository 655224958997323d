//! # Proof Payloads
//!
//! `(path, data)` pairs for every proof kind. The signing routine never
//! looks inside them; each constructor is the only place a given kind's
//! path and encoding are decided.

use prost::Message;
use shared_types::paths::{
    channel_path, client_state_path, connection_path, consensus_state_path, packet_commitment,
    packet_commitment_path,
};
use shared_types::proto::google::Any;
use shared_types::proto::ibc::{
    ChannelCounterparty, ChannelEnd, ChannelState, ConnectionCounterparty, ConnectionEnd,
    ConnectionState, MerklePrefix, Order, Packet, Version,
};
use shared_types::proto::solomachine::{HeaderData, SENTINEL_HEADER_PATH};
use shared_types::proto::tendermint::{ClientState, ConsensusState};
use shared_types::proto::to_any;
use shared_types::{Height, SoloMachineError, SoloResult};
use std::fmt;

/// What a payload proves, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    /// Local connection end in `TRYOPEN`.
    ConnectionTryOpen,
    /// Mirrored Tendermint client state.
    ClientState,
    /// Mirrored Tendermint consensus state at one height.
    ConsensusState,
    /// Local channel end in `TRYOPEN`.
    ChannelTryOpen,
    /// Commitment of an outgoing packet.
    PacketCommitment,
    /// Solo-machine update header.
    Header,
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProofKind::ConnectionTryOpen => "connection-tryopen",
            ProofKind::ClientState => "client-state",
            ProofKind::ConsensusState => "consensus-state",
            ProofKind::ChannelTryOpen => "channel-tryopen",
            ProofKind::PacketCommitment => "packet-commitment",
            ProofKind::Header => "header",
        };
        f.write_str(s)
    }
}

/// One value to be signed at one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofPayload {
    /// Proof kind
    pub kind: ProofKind,
    /// Commitment path
    pub path: String,
    /// Encoded value committed at `path`
    pub data: Vec<u8>,
}

impl ProofPayload {
    /// Local connection end in `TRYOPEN`, as the counterparty expects to find
    /// it at `connections/{connection_id}` when processing the ack.
    pub fn connection_try_open(
        connection_id: &str,
        client_id: &str,
        counterparty_client_id: &str,
        counterparty_connection_id: &str,
    ) -> Self {
        let end = ConnectionEnd {
            client_id: client_id.to_string(),
            versions: vec![Version::default_version()],
            state: ConnectionState::Tryopen as i32,
            counterparty: Some(ConnectionCounterparty {
                client_id: counterparty_client_id.to_string(),
                connection_id: counterparty_connection_id.to_string(),
                prefix: Some(MerklePrefix::ibc()),
            }),
            delay_period: 0,
        };
        Self {
            kind: ProofKind::ConnectionTryOpen,
            path: connection_path(connection_id),
            data: end.encode_to_vec(),
        }
    }

    /// Mirrored client state, packed as `Any`.
    pub fn client_state(client_id: &str, client_state: &ClientState) -> Self {
        Self {
            kind: ProofKind::ClientState,
            path: client_state_path(client_id),
            data: to_any(client_state).encode_to_vec(),
        }
    }

    /// Mirrored consensus state at `height`, packed as `Any`.
    pub fn consensus_state(client_id: &str, height: Height, consensus_state: &ConsensusState) -> Self {
        Self {
            kind: ProofKind::ConsensusState,
            path: consensus_state_path(client_id, height),
            data: to_any(consensus_state).encode_to_vec(),
        }
    }

    /// Local unordered channel end in `TRYOPEN` on `connection_id`.
    pub fn channel_try_open(
        port_id: &str,
        channel_id: &str,
        connection_id: &str,
        counterparty_port_id: &str,
        counterparty_channel_id: &str,
        version: &str,
    ) -> Self {
        let end = ChannelEnd {
            state: ChannelState::Tryopen as i32,
            ordering: Order::Unordered as i32,
            counterparty: Some(ChannelCounterparty {
                port_id: counterparty_port_id.to_string(),
                channel_id: counterparty_channel_id.to_string(),
            }),
            connection_hops: vec![connection_id.to_string()],
            version: version.to_string(),
        };
        Self {
            kind: ProofKind::ChannelTryOpen,
            path: channel_path(port_id, channel_id),
            data: end.encode_to_vec(),
        }
    }

    /// Commitment of `packet` at its source port, channel and sequence.
    pub fn packet_commitment(packet: &Packet) -> SoloResult<Self> {
        let timeout_height = packet.timeout_height.unwrap_or_else(Height::zero);
        if timeout_height.is_zero() && packet.timeout_timestamp == 0 {
            return Err(SoloMachineError::serialization(format!(
                "packet {} has neither a timeout height nor a timeout timestamp",
                packet.sequence
            )));
        }
        Ok(Self {
            kind: ProofKind::PacketCommitment,
            path: packet_commitment_path(&packet.source_port, &packet.source_channel, packet.sequence),
            data: packet_commitment(packet.timeout_timestamp, timeout_height, &packet.data),
        })
    }

    /// Update header data at the sentinel header path.
    pub fn header(new_public_key: &Any, new_diversifier: &str) -> Self {
        let data = HeaderData {
            new_pub_key: Some(new_public_key.clone()),
            new_diversifier: new_diversifier.to_string(),
        };
        Self {
            kind: ProofKind::Header,
            path: SENTINEL_HEADER_PATH.to_string(),
            data: data.encode_to_vec(),
        }
    }
}
