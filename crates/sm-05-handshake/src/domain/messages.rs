//! Handshake messages submitted to the counterparty.

use shared_types::proto::ibc::Version;
use shared_types::proto::tendermint::ClientState;
use shared_types::Height;

/// `MsgConnectionOpenAck` as the solo machine fills it in.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionOpenAck {
    /// Connection id on the counterparty
    pub connection_id: String,
    /// Local connection id
    pub counterparty_connection_id: String,
    /// Mirrored light-client state the counterparty validates as its own
    pub client_state: ClientState,
    /// Proof of the local connection end in `TRYOPEN`
    pub proof_try: Vec<u8>,
    /// Proof of `client_state`
    pub proof_client: Vec<u8>,
    /// Proof of the mirrored consensus state at `consensus_height`
    pub proof_consensus: Vec<u8>,
    /// Always zero: a solo machine has no heights of its own
    pub proof_height: Height,
    /// Height of the mirrored consensus state being proven
    pub consensus_height: Height,
    /// Negotiated connection version
    pub version: Version,
}

/// `MsgChannelOpenAck` as the solo machine fills it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOpenAck {
    /// Port on the counterparty
    pub port_id: String,
    /// Channel id on the counterparty
    pub channel_id: String,
    /// Local channel id
    pub counterparty_channel_id: String,
    /// Application version agreed on
    pub counterparty_version: String,
    /// Proof of the local channel end in `TRYOPEN`
    pub proof_try: Vec<u8>,
    /// Latest mirrored height
    pub proof_height: Height,
}
