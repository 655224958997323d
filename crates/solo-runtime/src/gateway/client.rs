//! Gateway-backed [`ChainClient`].
//!
//! Queries are single calls. Submissions are broadcast, then confirmed by
//! polling `tx_get` through [`wait_for_confirmation`]; identifiers are read
//! from the events of the confirmed transaction.

use super::transport::{GatewayTransport, HttpTransport};
use super::types::{
    BroadcastParams, BroadcastResponse, ClientStatusResponse, EncodedAny, EncodedValue,
    LatestHeaderResponse, StakingParamsResponse, TxMessage, TxResult,
};
use crate::config::ChainConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use shared_types::proto::ibc::{ChannelEnd, ConnectionEnd, Packet};
use shared_types::proto::solomachine::{
    ClientState as SoloClientState, ConsensusState as SoloConsensusState, Header,
};
use shared_types::proto::tendermint::ClientState as TmClientState;
use shared_types::{CounterpartyHeader, Height, SoloMachineError, SoloResult};
use sm_05_handshake::{
    wait_for_confirmation, ChainClient, ChannelOpenAck, ConnectionOpenAck, RetryPolicy,
};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

const MSG_CREATE_CLIENT: &str = "/ibc.core.client.v1.MsgCreateClient";
const MSG_UPDATE_CLIENT: &str = "/ibc.core.client.v1.MsgUpdateClient";
const MSG_CONNECTION_OPEN_INIT: &str = "/ibc.core.connection.v1.MsgConnectionOpenInit";
const MSG_CONNECTION_OPEN_ACK: &str = "/ibc.core.connection.v1.MsgConnectionOpenAck";
const MSG_CHANNEL_OPEN_INIT: &str = "/ibc.core.channel.v1.MsgChannelOpenInit";
const MSG_CHANNEL_OPEN_ACK: &str = "/ibc.core.channel.v1.MsgChannelOpenAck";
const MSG_RECV_PACKET: &str = "/ibc.core.channel.v1.MsgRecvPacket";

/// Commitment prefix of the counterparty's IBC store.
const COMMITMENT_PREFIX: &str = "ibc";

/// Counterparty chain reached through its gateway.
pub struct GatewayChainClient<T: GatewayTransport = HttpTransport> {
    chain_name: String,
    chain: ChainConfig,
    policy: RetryPolicy,
    cancel: Option<watch::Receiver<bool>>,
    transport: T,
}

impl GatewayChainClient<HttpTransport> {
    /// Client for `chain` over HTTP.
    pub fn connect(chain_name: &str, chain: &ChainConfig, policy: RetryPolicy) -> SoloResult<Self> {
        let transport =
            HttpTransport::new(chain.gateway_addr.as_str()).map_err(|e| e.into_solo(chain_name))?;
        Ok(Self::with_transport(chain_name, chain, policy, transport))
    }
}

impl<T: GatewayTransport> GatewayChainClient<T> {
    /// Client for `chain` over an explicit transport.
    pub fn with_transport(
        chain_name: &str,
        chain: &ChainConfig,
        policy: RetryPolicy,
        transport: T,
    ) -> Self {
        Self {
            chain_name: chain_name.to_string(),
            chain: chain.clone(),
            policy,
            cancel: None,
            transport,
        }
    }

    /// Abandon confirmation waits once `cancel` turns true.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Chain id from the configuration.
    pub fn chain_id(&self) -> &str {
        &self.chain.chain_id
    }

    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> SoloResult<Option<serde_json::Value>> {
        self.transport
            .call(method, params)
            .await
            .map_err(|e| e.into_solo(&self.chain_name))
    }

    async fn query<R: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> SoloResult<R> {
        let value = self
            .call(method, params.clone())
            .await?
            .ok_or_else(|| SoloMachineError::not_found(format!("{method} {params}")))?;
        decode(value)
    }

    async fn poll_tx(&self, tx_hash: &str) -> SoloResult<Option<TxResult>> {
        match self.call("tx_get", json!({ "hash": tx_hash })).await? {
            Some(value) => Ok(Some(decode(value)?)),
            None => Ok(None),
        }
    }

    /// Broadcast one message and wait until it is included successfully.
    async fn submit(&self, type_url: &'static str, body: serde_json::Value) -> SoloResult<TxResult> {
        let params = BroadcastParams {
            key_name: self.chain.key_name.clone(),
            keyring_backend: self.chain.keyring_backend.clone(),
            account_prefix: self.chain.account_prefix.clone(),
            gas: self.chain.gas,
            gas_prices: self.chain.gas_prices.clone(),
            gas_adjustment: self.chain.gas_adjustment,
            messages: vec![TxMessage { type_url, body }],
        };
        let params = serde_json::to_value(&params)?;
        let broadcast: BroadcastResponse = self.query("tx_broadcast", params).await?;
        debug!(chain = %self.chain_name, msg = type_url, tx_hash = %broadcast.tx_hash, "broadcast");

        let what = format!("{type_url} tx {}", broadcast.tx_hash);
        let result = wait_for_confirmation(&what, &self.policy, self.cancel.clone(), |_| {
            self.poll_tx(&broadcast.tx_hash)
        })
        .await?
        .ensure_success(&self.chain_name)?;
        info!(
            chain = %self.chain_name,
            msg = type_url,
            tx_hash = %result.tx_hash,
            height = result.height,
            "transaction confirmed"
        );
        Ok(result)
    }
}

fn decode<R: DeserializeOwned>(value: serde_json::Value) -> SoloResult<R> {
    serde_json::from_value(value).map_err(SoloMachineError::serialization)
}

#[async_trait]
impl<T: GatewayTransport> ChainClient for GatewayChainClient<T> {
    async fn query_client_state(&self, client_id: &str) -> SoloResult<SoloClientState> {
        let state: EncodedAny = self
            .query("ibc_clientState", json!({ "client_id": client_id }))
            .await?;
        state.unpack()
    }

    async fn query_connection(&self, connection_id: &str) -> SoloResult<ConnectionEnd> {
        let end: EncodedValue = self
            .query("ibc_connection", json!({ "connection_id": connection_id }))
            .await?;
        end.decode()
    }

    async fn query_channel(&self, port_id: &str, channel_id: &str) -> SoloResult<ChannelEnd> {
        let end: EncodedValue = self
            .query("ibc_channel", json!({ "port_id": port_id, "channel_id": channel_id }))
            .await?;
        end.decode()
    }

    async fn client_is_active(&self, client_id: &str) -> SoloResult<bool> {
        let status: ClientStatusResponse = self
            .query("ibc_clientStatus", json!({ "client_id": client_id }))
            .await?;
        Ok(status.status == "Active")
    }

    async fn create_client(
        &self,
        client_state: &SoloClientState,
        consensus_state: &SoloConsensusState,
    ) -> SoloResult<String> {
        let body = json!({
            "client_state": EncodedAny::pack(client_state),
            "consensus_state": EncodedAny::pack(consensus_state),
        });
        self.submit(MSG_CREATE_CLIENT, body)
            .await?
            .attribute("create_client", "client_id")
    }

    async fn update_client(&self, client_id: &str, header: &Header) -> SoloResult<()> {
        let body = json!({
            "client_id": client_id,
            "client_message": EncodedAny::pack(header),
        });
        self.submit(MSG_UPDATE_CLIENT, body).await?;
        Ok(())
    }

    async fn init_connection(&self, client_id: &str, counterparty_client_id: &str) -> SoloResult<String> {
        let body = json!({
            "client_id": client_id,
            "counterparty": {
                "client_id": counterparty_client_id,
                "prefix": COMMITMENT_PREFIX,
            },
            "delay_period": 0,
        });
        self.submit(MSG_CONNECTION_OPEN_INIT, body)
            .await?
            .attribute("connection_open_init", "connection_id")
    }

    async fn connection_open_ack(&self, msg: &ConnectionOpenAck) -> SoloResult<()> {
        let body = json!({
            "connection_id": msg.connection_id,
            "counterparty_connection_id": msg.counterparty_connection_id,
            "version": EncodedValue::encode(&msg.version),
            "client_state": EncodedAny::pack(&msg.client_state),
            "proof_height": msg.proof_height,
            "proof_try": hex::encode(&msg.proof_try),
            "proof_client": hex::encode(&msg.proof_client),
            "proof_consensus": hex::encode(&msg.proof_consensus),
            "consensus_height": msg.consensus_height,
        });
        self.submit(MSG_CONNECTION_OPEN_ACK, body).await?;
        Ok(())
    }

    async fn init_channel(
        &self,
        connection_id: &str,
        port_id: &str,
        version: &str,
        counterparty_port_id: &str,
    ) -> SoloResult<String> {
        let body = json!({
            "port_id": port_id,
            "channel": {
                "state": "STATE_INIT",
                "ordering": "ORDER_UNORDERED",
                "counterparty": { "port_id": counterparty_port_id },
                "connection_hops": [connection_id],
                "version": version,
            },
        });
        self.submit(MSG_CHANNEL_OPEN_INIT, body)
            .await?
            .attribute("channel_open_init", "channel_id")
    }

    async fn channel_open_ack(&self, msg: &ChannelOpenAck) -> SoloResult<()> {
        let body = json!({
            "port_id": msg.port_id,
            "channel_id": msg.channel_id,
            "counterparty_channel_id": msg.counterparty_channel_id,
            "counterparty_version": msg.counterparty_version,
            "proof_try": hex::encode(&msg.proof_try),
            "proof_height": msg.proof_height,
        });
        self.submit(MSG_CHANNEL_OPEN_ACK, body).await?;
        Ok(())
    }

    async fn submit_packet(&self, packet: &Packet, proof: &[u8], proof_height: Height) -> SoloResult<()> {
        let body = json!({
            "packet": EncodedValue::encode(packet),
            "proof_commitment": hex::encode(proof),
            "proof_height": proof_height,
        });
        self.submit(MSG_RECV_PACKET, body).await?;
        Ok(())
    }

    async fn unbonding_period(&self) -> SoloResult<Duration> {
        let params: StakingParamsResponse = self.query("staking_params", json!({})).await?;
        Ok(Duration::from_secs(params.unbonding_time_secs))
    }

    async fn latest_header_and_client_state(&self) -> SoloResult<(CounterpartyHeader, TmClientState)> {
        let latest: LatestHeaderResponse = self.query("ibc_latestHeader", json!({})).await?;
        if latest.header.chain_id != self.chain.chain_id {
            return Err(SoloMachineError::protocol_state(
                &self.chain_name,
                "latest-header",
                format!(
                    "gateway reports chain id {}, configured {}",
                    latest.header.chain_id, self.chain.chain_id
                ),
            ));
        }
        let client_state = latest.client_state.unpack()?;
        Ok((latest.header, client_state))
    }
}
