//! # Chain-Link Registry
//!
//! Per-counterparty record under `chains/<chain-name>`: diversifier,
//! identifiers on both sides, local handshake states, packet sequence and the
//! local identifier counters.
//!
//! Writes are staged on the shared store and become visible on the next
//! commit. The handshake service commits once per confirmed step, so every
//! write of a step lands together.

use crate::domain::invariants::{invariant_never_reassigned, invariant_prerequisites_set};
use crate::domain::value_objects::counter_key;
use crate::domain::{generate_diversifier, is_valid_diversifier, ChainLink, LinkField};
use shared_types::proto::ibc::{ChannelState, ConnectionState};
use shared_types::{SoloMachineError, SoloResult};
use sm_01_protocol_store::{Namespace, ProtocolStore};
use tracing::{debug, info};

/// Namespace holding every chain link.
pub const CHAINS_NAMESPACE: &str = "chains";
/// Merkle sub-namespace holding the mirrored light client.
pub const LIGHT_CLIENT_NAMESPACE: &str = "light-client";

const DIVERSIFIER: &str = "diversifier";
const CONNECTION_STATE: &str = "connection-state";
const CHANNEL_STATE: &str = "channel-state";
const NEXT_PACKET_SEQUENCE: &str = "next-packet-sequence";
const INITIAL_PACKET_SEQUENCE: u64 = 1;

/// Handle to one chain link.
#[derive(Clone)]
pub struct ChainLinkStore {
    chain_name: String,
    ns: Namespace,
    diversifier: String,
}

impl ChainLinkStore {
    /// True if a link for `chain_name` has been committed.
    pub fn exists(store: &ProtocolStore, chain_name: &str) -> SoloResult<bool> {
        store
            .namespace(CHAINS_NAMESPACE)
            .child(chain_name)
            .has(DIVERSIFIER)
    }

    /// Open the link for `chain_name`, creating it with a fresh diversifier
    /// on first use.
    pub fn open(store: &ProtocolStore, chain_name: &str) -> SoloResult<Self> {
        if chain_name.is_empty() {
            return Err(SoloMachineError::Configuration {
                message: "chain name must not be empty".to_string(),
            });
        }
        let ns = store.namespace(CHAINS_NAMESPACE).child(chain_name);
        let diversifier = match ns.get_string(DIVERSIFIER)? {
            Some(d) if is_valid_diversifier(&d) => d,
            Some(d) => {
                return Err(SoloMachineError::corrupted(format!(
                    "chain {chain_name}: diversifier {d:?} is malformed"
                )))
            }
            None => {
                let d = generate_diversifier();
                ns.set_string(DIVERSIFIER, &d);
                store.commit()?;
                info!(chain = chain_name, diversifier = %d, "created chain link");
                d
            }
        };
        Ok(Self {
            chain_name: chain_name.to_string(),
            ns,
            diversifier,
        })
    }

    /// Chain-link name.
    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    /// Immutable diversifier.
    pub fn diversifier(&self) -> &str {
        &self.diversifier
    }

    /// Store the link lives in.
    pub fn store(&self) -> &ProtocolStore {
        self.ns.store()
    }

    /// Merkle-committed namespace owned by this link's mirrored light client.
    pub fn light_client_namespace(&self) -> Namespace {
        self.ns.merkle_child(LIGHT_CLIENT_NAMESPACE)
    }

    /// Committed snapshot of the link.
    pub fn record(&self) -> SoloResult<ChainLink> {
        let mut link = ChainLink {
            chain_name: self.chain_name.clone(),
            diversifier: self.diversifier.clone(),
            connection_state: self.connection_state()?,
            channel_state: self.channel_state()?,
            next_packet_sequence: self.packet_sequence()?,
            ..Default::default()
        };
        for field in LinkField::ALL {
            let value = self.ns.get_string(field.key())?;
            match field {
                LinkField::CounterpartyClientId => link.counterparty_client_id = value,
                LinkField::ClientId => link.client_id = value,
                LinkField::CounterpartyConnectionId => link.counterparty_connection_id = value,
                LinkField::ConnectionId => link.connection_id = value,
                LinkField::CounterpartyChannelId => link.counterparty_channel_id = value,
                LinkField::ChannelId => link.channel_id = value,
            }
        }
        Ok(link)
    }

    /// Committed value of one identifier.
    pub fn get(&self, field: LinkField) -> SoloResult<Option<String>> {
        self.ns.get_string(field.key())
    }

    /// Committed value of one identifier, or a `ProtocolState` error naming
    /// the missing prerequisite.
    pub fn require(&self, field: LinkField, step: &str) -> SoloResult<String> {
        self.get(field)?.ok_or_else(|| {
            SoloMachineError::protocol_state(
                &self.chain_name,
                step,
                format!("{} is not set", field.key()),
            )
        })
    }

    /// Stage an identifier returned by the counterparty.
    pub fn assign(&self, field: LinkField, value: &str) -> SoloResult<()> {
        shared_types::identifiers::validate_identifier(value)?;
        let link = self.record()?;
        invariant_prerequisites_set(&link, field)?;
        invariant_never_reassigned(&link, field, value)?;
        self.ns.set_string(field.key(), value);
        debug!(chain = %self.chain_name, field = field.key(), value, "identifier staged");
        Ok(())
    }

    /// Allocate the next local identifier for `field` from this link's
    /// counter and stage both the identifier and the advanced counter.
    pub fn allocate(&self, field: LinkField) -> SoloResult<String> {
        let kind = field.local_kind().ok_or_else(|| {
            SoloMachineError::protocol_state(
                &self.chain_name,
                field.key(),
                "identifier is assigned by the counterparty",
            )
        })?;
        let link = self.record()?;
        if let Some(existing) = link.field(field) {
            return Err(SoloMachineError::protocol_state(
                &self.chain_name,
                field.key(),
                format!("already set to {existing}"),
            ));
        }
        invariant_prerequisites_set(&link, field)?;

        let counter = counter_key(kind);
        let n = self.ns.get_u64(counter)?.unwrap_or(0);
        let id = kind.format(n);
        self.ns.set_u64(counter, n + 1);
        self.ns.set_string(field.key(), &id);
        debug!(chain = %self.chain_name, field = field.key(), id = %id, "identifier allocated");
        Ok(id)
    }

    /// Committed local connection state.
    pub fn connection_state(&self) -> SoloResult<Option<ConnectionState>> {
        self.parse_state(CONNECTION_STATE, ConnectionState::from_str_name)
    }

    /// Committed local channel state.
    pub fn channel_state(&self) -> SoloResult<Option<ChannelState>> {
        self.parse_state(CHANNEL_STATE, ChannelState::from_str_name)
    }

    /// Stage the local connection state. Requires a local connection id;
    /// `STATE_OPEN` is terminal.
    pub fn set_connection_state(&self, state: ConnectionState) -> SoloResult<()> {
        let link = self.record()?;
        if link.connection_id.is_none() {
            return Err(SoloMachineError::protocol_state(
                &self.chain_name,
                CONNECTION_STATE,
                "connection-id is not set",
            ));
        }
        if link.connection_open() && state != ConnectionState::Open {
            return Err(SoloMachineError::protocol_state(
                &self.chain_name,
                CONNECTION_STATE,
                format!("connection is open, refusing {}", state.as_str_name()),
            ));
        }
        self.ns.set_string(CONNECTION_STATE, state.as_str_name());
        Ok(())
    }

    /// Stage the local channel state. Requires a local channel id;
    /// `STATE_OPEN` is terminal.
    pub fn set_channel_state(&self, state: ChannelState) -> SoloResult<()> {
        let link = self.record()?;
        if link.channel_id.is_none() {
            return Err(SoloMachineError::protocol_state(
                &self.chain_name,
                CHANNEL_STATE,
                "ics20-channel-id is not set",
            ));
        }
        if link.channel_open() && state != ChannelState::Open {
            return Err(SoloMachineError::protocol_state(
                &self.chain_name,
                CHANNEL_STATE,
                format!("channel is open, refusing {}", state.as_str_name()),
            ));
        }
        self.ns.set_string(CHANNEL_STATE, state.as_str_name());
        Ok(())
    }

    /// Committed next ICS-20 packet sequence.
    pub fn packet_sequence(&self) -> SoloResult<u64> {
        Ok(self
            .ns
            .get_u64(NEXT_PACKET_SEQUENCE)?
            .unwrap_or(INITIAL_PACKET_SEQUENCE))
    }

    /// Stage the packet sequence past `sent`, once the packet was accepted.
    pub fn record_packet_sent(&self, sent: u64) -> SoloResult<()> {
        let current = self.packet_sequence()?;
        if sent != current {
            return Err(SoloMachineError::protocol_state(
                &self.chain_name,
                NEXT_PACKET_SEQUENCE,
                format!("packet {sent} sent but {current} was next"),
            ));
        }
        self.ns.set_u64(NEXT_PACKET_SEQUENCE, current + 1);
        Ok(())
    }

    /// Commit everything staged on the shared store.
    pub fn commit(&self) -> SoloResult<u64> {
        self.ns.store().commit()
    }

    /// Drop everything staged on the shared store.
    pub fn discard(&self) {
        self.ns.store().discard()
    }

    fn parse_state<T>(&self, key: &str, parse: fn(&str) -> Option<T>) -> SoloResult<Option<T>> {
        match self.ns.get_string(key)? {
            None => Ok(None),
            Some(raw) => parse(&raw).map(Some).ok_or_else(|| {
                SoloMachineError::corrupted(format!(
                    "chain {}: {key} holds unknown state {raw:?}",
                    self.chain_name
                ))
            }),
        }
    }
}

impl std::fmt::Debug for ChainLinkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainLinkStore")
            .field("chain_name", &self.chain_name)
            .field("diversifier", &self.diversifier)
            .finish()
    }
}
