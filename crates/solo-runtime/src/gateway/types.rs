//! Gateway wire types.
//!
//! The gateway speaks JSON-RPC 2.0. Protobuf values travel as
//! `{type_url, value}` with hex-encoded bytes.

use prost::Message;
use serde::{Deserialize, Serialize};
use shared_types::proto::TypeUrl;
use shared_types::{SoloMachineError, SoloResult};

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<P> {
    /// Always `"2.0"`
    pub jsonrpc: &'static str,
    /// Method name
    pub method: String,
    /// Parameters
    pub params: P,
    /// Request id
    pub id: u64,
}

impl<P> JsonRpcRequest<P> {
    /// Build a request.
    pub fn new(method: &str, params: P, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
            id,
        }
    }
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<R> {
    /// Present on success
    pub result: Option<R>,
    /// Present on failure
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,
    /// Human-readable message
    pub message: String,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// A protobuf message packed for JSON transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAny {
    /// Protobuf type URL
    pub type_url: String,
    /// Encoded message
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,
}

impl EncodedAny {
    /// Pack `msg`.
    pub fn pack<M: Message + TypeUrl>(msg: &M) -> Self {
        Self {
            type_url: M::TYPE_URL.to_string(),
            value: msg.encode_to_vec(),
        }
    }

    /// Unpack into `M`, checking the type URL.
    pub fn unpack<M: Message + TypeUrl + Default>(&self) -> SoloResult<M> {
        if self.type_url != M::TYPE_URL {
            return Err(SoloMachineError::serialization(format!(
                "expected {}, got {}",
                M::TYPE_URL,
                self.type_url
            )));
        }
        Ok(M::decode(self.value.as_slice())?)
    }
}

/// Encoded bytes of a message without a type URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedValue {
    /// Encoded message
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,
}

impl EncodedValue {
    /// Encode `msg`.
    pub fn encode<M: Message>(msg: &M) -> Self {
        Self {
            value: msg.encode_to_vec(),
        }
    }

    /// Decode into `M`.
    pub fn decode<M: Message + Default>(&self) -> SoloResult<M> {
        Ok(M::decode(self.value.as_slice())?)
    }
}

/// One message of a transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TxMessage {
    /// Message type, e.g. `/ibc.core.client.v1.MsgCreateClient`
    pub type_url: &'static str,
    /// Message fields
    pub body: serde_json::Value,
}

/// Fee and signer parameters sent with every broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastParams {
    /// Fee payer key
    pub key_name: String,
    /// Keyring holding `key_name`
    pub keyring_backend: String,
    /// Bech32 prefix of the fee payer address
    pub account_prefix: String,
    /// Gas limit
    pub gas: u64,
    /// Gas price with denomination
    pub gas_prices: String,
    /// Simulation multiplier
    pub gas_adjustment: f64,
    /// Messages to include
    pub messages: Vec<TxMessage>,
}

/// Result of `tx_broadcast`.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastResponse {
    /// Hash of the accepted transaction
    pub tx_hash: String,
}

/// Result of `tx_get` once the transaction is in a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TxResult {
    /// Transaction hash
    pub tx_hash: String,
    /// Block height
    pub height: u64,
    /// ABCI result code; zero on success
    pub code: u32,
    /// Log returned with the result
    #[serde(default)]
    pub raw_log: String,
    /// Emitted events
    #[serde(default)]
    pub events: Vec<TxEvent>,
}

/// An ABCI event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TxEvent {
    /// Event type, e.g. `create_client`
    #[serde(rename = "type")]
    pub kind: String,
    /// Key/value attributes
    #[serde(default)]
    pub attributes: Vec<TxAttribute>,
}

/// One event attribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TxAttribute {
    /// Attribute key
    pub key: String,
    /// Attribute value
    pub value: String,
}

impl TxResult {
    /// Fail with `TransactionFailed` unless the code is zero.
    pub fn ensure_success(self, chain: &str) -> SoloResult<Self> {
        if self.code == 0 {
            return Ok(self);
        }
        Err(SoloMachineError::TransactionFailed {
            chain: chain.to_string(),
            tx_hash: self.tx_hash,
            raw_log: self.raw_log,
        })
    }

    /// Value of `attribute` in the first `event` carrying it.
    pub fn attribute(&self, event: &str, attribute: &str) -> SoloResult<String> {
        self.events
            .iter()
            .filter(|e| e.kind == event)
            .flat_map(|e| e.attributes.iter())
            .find(|a| a.key == attribute)
            .map(|a| a.value.clone())
            .ok_or_else(|| SoloMachineError::AttributeNotFound {
                event: event.to_string(),
                attribute: attribute.to_string(),
            })
    }
}

/// Result of `ibc_latestHeader`.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestHeaderResponse {
    /// Latest header
    pub header: shared_types::CounterpartyHeader,
    /// Tendermint client state tracking the chain at that header
    pub client_state: EncodedAny,
}

/// Result of `ibc_clientStatus`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientStatusResponse {
    /// `Active`, `Frozen`, `Expired` or `Unknown`
    pub status: String,
}

/// Result of `staking_params`.
#[derive(Debug, Clone, Deserialize)]
pub struct StakingParamsResponse {
    /// Unbonding period in seconds
    pub unbonding_time_secs: u64,
}
