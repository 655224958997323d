//! # Domain Entities
//!
//! Requests and reports exchanged with the orchestrator's callers.

use serde::{Deserialize, Serialize};
use shared_types::{FungibleTokenPacketData, Height, SoloResult};
use sm_02_identity::ChainLink;
use sm_04_light_client::HeaderOutcome;

/// One push/pull round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Sequence the pushed header was signed at.
    pub pushed_sequence: u64,
    /// What happened to the pulled header.
    pub pulled: HeaderOutcome,
}

/// An ICS-20 transfer out of the solo machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Denomination to send
    pub denom: String,
    /// Amount to send
    pub amount: u128,
    /// Sender, as recorded in the packet
    pub sender: String,
    /// Recipient address on the counterparty
    pub receiver: String,
    /// Optional memo
    #[serde(default)]
    pub memo: String,
}

impl TransferRequest {
    /// Validated packet payload.
    pub fn packet_data(&self) -> SoloResult<FungibleTokenPacketData> {
        let mut data = FungibleTokenPacketData::new(
            self.denom.as_str(),
            self.amount,
            self.sender.as_str(),
            self.receiver.as_str(),
        )?;
        data.memo = self.memo.clone();
        Ok(data)
    }
}

/// A packet the counterparty accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    /// ICS-20 packet sequence
    pub packet_sequence: u64,
    /// Solo-machine sequence the commitment proof consumed
    pub proof_sequence: u64,
    /// Local channel
    pub source_channel: String,
    /// Counterparty channel
    pub destination_channel: String,
    /// Counterparty height after which the packet times out
    pub timeout_height: Height,
}

/// Local records next to what the counterparty currently reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    /// Chain-link name
    pub chain_name: String,
    /// Diversifier bound to the link
    pub diversifier: String,
    /// Next solo-machine sequence
    pub local_sequence: u64,
    /// Mirrored Tendermint client
    pub client_id: Option<String>,
    /// Latest height the mirrored client holds
    pub light_client_height: Option<Height>,
    /// Counterparty's current height
    pub counterparty_height: Option<Height>,
    /// Solo-machine client on the counterparty
    pub counterparty_client_id: Option<String>,
    /// Sequence that client expects next
    pub counterparty_sequence: Option<u64>,
    /// Whether that client is active
    pub counterparty_client_active: Option<bool>,
    /// Local connection
    pub connection_id: Option<String>,
    /// Counterparty connection
    pub counterparty_connection_id: Option<String>,
    /// Local connection state
    pub connection_state: Option<String>,
    /// Counterparty connection state
    pub counterparty_connection_state: Option<String>,
    /// Local ICS-20 channel
    pub channel_id: Option<String>,
    /// Counterparty ICS-20 channel
    pub counterparty_channel_id: Option<String>,
    /// Local channel state
    pub channel_state: Option<String>,
    /// Counterparty channel state
    pub counterparty_channel_state: Option<String>,
    /// Next ICS-20 packet sequence
    pub next_packet_sequence: u64,
}

impl LinkStatus {
    /// Status holding only the locally persisted fields.
    pub fn from_record(link: &ChainLink, local_sequence: u64) -> Self {
        Self {
            chain_name: link.chain_name.clone(),
            diversifier: link.diversifier.clone(),
            local_sequence,
            client_id: link.client_id.clone(),
            counterparty_client_id: link.counterparty_client_id.clone(),
            connection_id: link.connection_id.clone(),
            counterparty_connection_id: link.counterparty_connection_id.clone(),
            connection_state: link.connection_state.map(|s| s.as_str_name().to_string()),
            channel_id: link.channel_id.clone(),
            counterparty_channel_id: link.counterparty_channel_id.clone(),
            channel_state: link.channel_state.map(|s| s.as_str_name().to_string()),
            next_packet_sequence: link.next_packet_sequence,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::proto::ibc::ConnectionState;

    #[test]
    fn test_transfer_request_carries_memo() {
        let request = TransferRequest {
            denom: "stake".into(),
            amount: 10,
            sender: "solo".into(),
            receiver: "cosmos1xyz".into(),
            memo: "hello".into(),
        };
        let data = request.packet_data().unwrap();
        assert_eq!(data.memo, "hello");
        assert_eq!(data.amount, "10");
    }

    #[test]
    fn test_transfer_request_rejects_zero_amount() {
        let request = TransferRequest {
            denom: "stake".into(),
            amount: 0,
            sender: "solo".into(),
            receiver: "cosmos1xyz".into(),
            memo: String::new(),
        };
        assert!(request.packet_data().is_err());
    }

    #[test]
    fn test_status_from_record_renders_states() {
        let link = ChainLink {
            chain_name: "testchain".into(),
            diversifier: "abcdefghijklmno".into(),
            connection_id: Some("connection-0".into()),
            connection_state: Some(ConnectionState::Open),
            next_packet_sequence: 3,
            ..Default::default()
        };
        let status = LinkStatus::from_record(&link, 9);
        assert_eq!(status.connection_state.as_deref(), Some("STATE_OPEN"));
        assert_eq!(status.channel_state, None);
        assert_eq!(status.local_sequence, 9);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["next_packet_sequence"], 3);
    }
}
