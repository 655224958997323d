//! # Domain Entities
//!
//! The chain-link record and the handshake stage derived from it.

use super::value_objects::LinkField;
use serde::Serialize;
use shared_types::proto::ibc::{ChannelState, ConnectionState};
use std::fmt;

/// Progress of one handshake, derived from persisted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HandshakeStage {
    /// Prerequisites missing (no clients, or connection not open for a channel).
    NoClient,
    /// Clients exist on both sides (channel: connection is open).
    ClientCreated,
    /// The counterparty end is in `INIT`.
    CounterpartyInitiated,
    /// The local end has an identifier.
    LocalCreated,
    /// Both ends are open.
    Open,
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandshakeStage::NoClient => "no-client",
            HandshakeStage::ClientCreated => "client-created",
            HandshakeStage::CounterpartyInitiated => "counterparty-initiated",
            HandshakeStage::LocalCreated => "local-created",
            HandshakeStage::Open => "open",
        };
        f.write_str(s)
    }
}

/// Snapshot of everything persisted for one counterparty chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainLink {
    /// Chain-link name (the counterparty chain's configured name).
    pub chain_name: String,
    /// Diversifier bound to this link.
    pub diversifier: String,
    /// Solo-machine client id on the counterparty.
    pub counterparty_client_id: Option<String>,
    /// Mirrored Tendermint client id.
    pub client_id: Option<String>,
    /// Connection id on the counterparty.
    pub counterparty_connection_id: Option<String>,
    /// Local connection id.
    pub connection_id: Option<String>,
    /// ICS-20 channel id on the counterparty.
    pub counterparty_channel_id: Option<String>,
    /// Local ICS-20 channel id.
    pub channel_id: Option<String>,
    /// Local connection state.
    #[serde(serialize_with = "serialize_connection_state")]
    pub connection_state: Option<ConnectionState>,
    /// Local channel state.
    #[serde(serialize_with = "serialize_channel_state")]
    pub channel_state: Option<ChannelState>,
    /// Next ICS-20 packet sequence.
    pub next_packet_sequence: u64,
}

fn serialize_connection_state<S: serde::Serializer>(
    state: &Option<ConnectionState>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match state {
        Some(state) => s.serialize_some(state.as_str_name()),
        None => s.serialize_none(),
    }
}

fn serialize_channel_state<S: serde::Serializer>(
    state: &Option<ChannelState>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match state {
        Some(state) => s.serialize_some(state.as_str_name()),
        None => s.serialize_none(),
    }
}

impl ChainLink {
    /// Value of an identifier field.
    pub fn field(&self, field: LinkField) -> Option<&str> {
        let value = match field {
            LinkField::CounterpartyClientId => &self.counterparty_client_id,
            LinkField::ClientId => &self.client_id,
            LinkField::CounterpartyConnectionId => &self.counterparty_connection_id,
            LinkField::ConnectionId => &self.connection_id,
            LinkField::CounterpartyChannelId => &self.counterparty_channel_id,
            LinkField::ChannelId => &self.channel_id,
        };
        value.as_deref()
    }

    /// True once the connection is open locally.
    pub fn connection_open(&self) -> bool {
        self.connection_state == Some(ConnectionState::Open)
    }

    /// True once the ICS-20 channel is open locally.
    pub fn channel_open(&self) -> bool {
        self.channel_state == Some(ChannelState::Open)
    }

    /// Stage of the connection handshake.
    pub fn connection_stage(&self) -> HandshakeStage {
        if self.connection_open() {
            HandshakeStage::Open
        } else if self.connection_id.is_some() {
            HandshakeStage::LocalCreated
        } else if self.counterparty_connection_id.is_some() {
            HandshakeStage::CounterpartyInitiated
        } else if self.counterparty_client_id.is_some() && self.client_id.is_some() {
            HandshakeStage::ClientCreated
        } else {
            HandshakeStage::NoClient
        }
    }

    /// Stage of the channel handshake.
    pub fn channel_stage(&self) -> HandshakeStage {
        if self.channel_open() {
            HandshakeStage::Open
        } else if self.channel_id.is_some() {
            HandshakeStage::LocalCreated
        } else if self.counterparty_channel_id.is_some() {
            HandshakeStage::CounterpartyInitiated
        } else if self.connection_open() {
            HandshakeStage::ClientCreated
        } else {
            HandshakeStage::NoClient
        }
    }
}
