//! # Outbound Ports
//!
//! Everything the orchestrator needs from the counterparty chain. A
//! submission returns only once the transaction is confirmed; a rejected
//! transaction is `TransactionFailed`, a confirmation that never arrives is
//! `Timeout`.

use crate::domain::{ChannelOpenAck, ConnectionOpenAck};
use async_trait::async_trait;
use parking_lot::Mutex;
use prost::Message;
use shared_crypto::Secp256k1PublicKey;
use shared_types::proto::cosmos::{PubKey, SignatureData};
use shared_types::proto::from_any;
use shared_types::proto::ibc::{
    ChannelCounterparty, ChannelEnd, ChannelState, ConnectionCounterparty, ConnectionEnd,
    ConnectionState, MerklePrefix, Order, Packet, Version,
};
use shared_types::proto::tendermint::ClientState as TmClientState;
use shared_types::proto::solomachine::{
    ClientState as SoloClientState, ConsensusState as SoloConsensusState, Header, HeaderData,
    SENTINEL_HEADER_PATH,
};
use shared_types::{CounterpartyHeader, Height, IdentifierKind, SoloMachineError, SoloResult};
use sm_03_proof_generator::algorithms::sign_bytes::{decode_proof, verify_proof, verify_signature};
use sm_03_proof_generator::ProofPayload;
use sm_04_light_client::{build_client_state, LightClientConfig};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Counterparty chain - outbound port.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Solo-machine client state held by the counterparty.
    async fn query_client_state(&self, client_id: &str) -> SoloResult<SoloClientState>;

    /// Connection end on the counterparty.
    async fn query_connection(&self, connection_id: &str) -> SoloResult<ConnectionEnd>;

    /// Channel end on the counterparty.
    async fn query_channel(&self, port_id: &str, channel_id: &str) -> SoloResult<ChannelEnd>;

    /// Whether the counterparty reports the client as active.
    async fn client_is_active(&self, client_id: &str) -> SoloResult<bool>;

    /// Create the solo-machine client; returns its id.
    async fn create_client(
        &self,
        client_state: &SoloClientState,
        consensus_state: &SoloConsensusState,
    ) -> SoloResult<String>;

    /// Submit an update header to the solo-machine client.
    async fn update_client(&self, client_id: &str, header: &Header) -> SoloResult<()>;

    /// `ConnectionOpenInit` on the counterparty; returns the connection id.
    async fn init_connection(&self, client_id: &str, counterparty_client_id: &str) -> SoloResult<String>;

    /// `ConnectionOpenAck` on the counterparty.
    async fn connection_open_ack(&self, msg: &ConnectionOpenAck) -> SoloResult<()>;

    /// `ChannelOpenInit` on the counterparty; returns the channel id.
    async fn init_channel(
        &self,
        connection_id: &str,
        port_id: &str,
        version: &str,
        counterparty_port_id: &str,
    ) -> SoloResult<String>;

    /// `ChannelOpenAck` on the counterparty.
    async fn channel_open_ack(&self, msg: &ChannelOpenAck) -> SoloResult<()>;

    /// `RecvPacket` on the counterparty.
    async fn submit_packet(&self, packet: &Packet, proof: &[u8], proof_height: Height) -> SoloResult<()>;

    /// Counterparty staking unbonding period.
    async fn unbonding_period(&self) -> SoloResult<Duration>;

    /// Latest signed header of the counterparty together with the
    /// Tendermint client state a light client tracking it would start from.
    async fn latest_header_and_client_state(&self) -> SoloResult<(CounterpartyHeader, TmClientState)>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Seconds between mock blocks.
const MOCK_BLOCK_SECS: u64 = 5;
/// Mock genesis time, unix seconds.
const MOCK_GENESIS_SECS: u64 = 1_700_000_000;

#[derive(Debug)]
struct MockChain {
    chain_id: String,
    height: Height,
    unbonding: Duration,
    clients: BTreeMap<String, SoloClientState>,
    frozen: Vec<String>,
    connections: BTreeMap<String, ConnectionEnd>,
    channels: BTreeMap<String, ChannelEnd>,
    headers: BTreeMap<Height, CounterpartyHeader>,
    counters: HashMap<&'static str, u64>,
    packets: Vec<Packet>,
    calls: Vec<String>,
    submissions: usize,
    offline: bool,
    reject_next: Option<String>,
    reject_calls: HashMap<String, String>,
}

impl MockChain {
    fn next_id(&mut self, prefix: &'static str) -> String {
        let n = self.counters.entry(prefix).or_insert(0);
        let id = format!("{prefix}-{n}");
        *n += 1;
        id
    }

    fn header_at(&mut self, height: Height) -> CounterpartyHeader {
        let chain_id = self.chain_id.clone();
        self.headers
            .entry(height)
            .or_insert_with(|| CounterpartyHeader {
                chain_id,
                height,
                trusted_height: Height::zero(),
                timestamp_nanos: (MOCK_GENESIS_SECS + height.revision_height * MOCK_BLOCK_SECS)
                    * 1_000_000_000,
                app_hash: height.revision_height.to_be_bytes().repeat(4),
                next_validators_hash: vec![0x42; 32],
                raw: Vec::new(),
            })
            .clone()
    }

    fn client(&self, client_id: &str) -> SoloResult<&SoloClientState> {
        self.clients
            .get(client_id)
            .ok_or_else(|| SoloMachineError::not_found(format!("client {client_id}")))
    }

    fn verifying_key(&self, client_id: &str) -> SoloResult<(Secp256k1PublicKey, String, u64)> {
        let client = self.client(client_id)?;
        let consensus = client
            .consensus_state
            .as_ref()
            .ok_or_else(|| SoloMachineError::serialization("client has no consensus state"))?;
        let any = consensus
            .public_key
            .as_ref()
            .ok_or_else(|| SoloMachineError::serialization("consensus state has no public key"))?;
        let key = from_any::<PubKey>(any)?;
        let key = Secp256k1PublicKey::from_slice(&key.key).map_err(|e| SoloMachineError::Signing {
            message: e.to_string(),
        })?;
        Ok((key, consensus.diversifier.clone(), consensus.timestamp))
    }

    /// Check one proof at `client.sequence + offset`, as the solo-machine
    /// client on a real chain does.
    fn verify(&self, client_id: &str, offset: u64, payload: &ProofPayload, proof: &[u8]) -> Result<(), String> {
        let (key, diversifier, consensus_time) =
            self.verifying_key(client_id).map_err(|e| e.to_string())?;
        let sequence = self.client(client_id).map_err(|e| e.to_string())?.sequence + offset;
        let (timestamp, _) = decode_proof(proof).map_err(|e| e.to_string())?;
        if timestamp < consensus_time {
            return Err(format!("proof timestamp {timestamp} precedes consensus time {consensus_time}"));
        }
        verify_proof(&key, sequence, &diversifier, payload.path.as_bytes(), &payload.data, proof)
            .map_err(|e| format!("{} proof: {e}", payload.kind))
    }

    fn advance_sequence(&mut self, client_id: &str, by: u64) {
        if let Some(client) = self.clients.get_mut(client_id) {
            client.sequence += by;
        }
    }
}

/// In-memory counterparty for testing.
///
/// Behaves like an IBC chain hosting a solo-machine client: identifiers are
/// handed out in order, every proof is verified against the client's key,
/// diversifier and sequence, and accepted proofs advance the sequence.
#[derive(Debug)]
pub struct MockChainClient {
    name: String,
    state: Mutex<MockChain>,
}

impl MockChainClient {
    /// Chain `chain_id` at height 10 with a 21 day unbonding period.
    pub fn new(chain_id: &str) -> Self {
        let revision = Height::revision_from_chain_id(chain_id);
        Self {
            name: chain_id.to_string(),
            state: Mutex::new(MockChain {
                chain_id: chain_id.to_string(),
                height: Height::new(revision, 10),
                unbonding: Duration::from_secs(21 * 24 * 3600),
                clients: BTreeMap::new(),
                frozen: Vec::new(),
                connections: BTreeMap::new(),
                channels: BTreeMap::new(),
                headers: BTreeMap::new(),
                counters: HashMap::new(),
                packets: Vec::new(),
                calls: Vec::new(),
                submissions: 0,
                offline: false,
                reject_next: None,
                reject_calls: HashMap::new(),
            }),
        }
    }

    /// Produce `blocks` more blocks.
    pub fn advance_blocks(&self, blocks: u64) {
        let mut chain = self.state.lock();
        chain.height = chain.height.add_blocks(blocks);
    }

    /// Current height.
    pub fn height(&self) -> Height {
        self.state.lock().height
    }

    /// Fail every call with a network error while `offline`.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Reject the next submission with `raw_log`.
    pub fn reject_next_submission(&self, raw_log: &str) {
        self.state.lock().reject_next = Some(raw_log.to_string());
    }

    /// Reject the next `call` (e.g. `"submit_packet"`) with `raw_log`.
    pub fn reject_next_call(&self, call: &str, raw_log: &str) {
        self.state
            .lock()
            .reject_calls
            .insert(call.to_string(), raw_log.to_string());
    }

    /// Freeze a client.
    pub fn freeze_client(&self, client_id: &str) {
        let mut chain = self.state.lock();
        if let Some(client) = chain.clients.get_mut(client_id) {
            client.is_frozen = true;
        }
        chain.frozen.push(client_id.to_string());
    }

    /// Overwrite a connection's state, as another relayer could.
    pub fn set_connection_state(&self, connection_id: &str, state: ConnectionState) {
        if let Some(end) = self.state.lock().connections.get_mut(connection_id) {
            end.state = state as i32;
        }
    }

    /// Overwrite a channel's state.
    pub fn set_channel_state(&self, channel_id: &str, state: ChannelState) {
        if let Some(end) = self.state.lock().channels.get_mut(channel_id) {
            end.state = state as i32;
        }
    }

    /// Sequence the client expects next.
    pub fn client_sequence(&self, client_id: &str) -> Option<u64> {
        self.state.lock().clients.get(client_id).map(|c| c.sequence)
    }

    /// Connection end, if any.
    pub fn connection(&self, connection_id: &str) -> Option<ConnectionEnd> {
        self.state.lock().connections.get(connection_id).cloned()
    }

    /// Channel end, if any.
    pub fn channel(&self, channel_id: &str) -> Option<ChannelEnd> {
        self.state.lock().channels.get(channel_id).cloned()
    }

    /// Packets received so far.
    pub fn packets(&self) -> Vec<Packet> {
        self.state.lock().packets.clone()
    }

    /// Every call in order, queries included.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Number of confirmed submissions.
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    fn enter(&self, call: &str) -> SoloResult<parking_lot::MutexGuard<'_, MockChain>> {
        let mut chain = self.state.lock();
        chain.calls.push(call.to_string());
        if chain.offline {
            return Err(SoloMachineError::network(&self.name, "connection refused"));
        }
        Ok(chain)
    }

    fn submit(&self, call: &str) -> SoloResult<parking_lot::MutexGuard<'_, MockChain>> {
        let mut chain = self.enter(call)?;
        if let Some(raw_log) = chain.reject_next.take() {
            return Err(self.rejected(call, raw_log));
        }
        if let Some(raw_log) = chain.reject_calls.remove(call) {
            return Err(self.rejected(call, raw_log));
        }
        Ok(chain)
    }

    fn rejected(&self, call: &str, raw_log: String) -> SoloMachineError {
        SoloMachineError::TransactionFailed {
            chain: self.name.clone(),
            tx_hash: format!("mock-{call}"),
            raw_log,
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn query_client_state(&self, client_id: &str) -> SoloResult<SoloClientState> {
        let chain = self.enter("query_client_state")?;
        chain.client(client_id).cloned()
    }

    async fn query_connection(&self, connection_id: &str) -> SoloResult<ConnectionEnd> {
        let chain = self.enter("query_connection")?;
        chain
            .connections
            .get(connection_id)
            .cloned()
            .ok_or_else(|| SoloMachineError::not_found(format!("connection {connection_id}")))
    }

    async fn query_channel(&self, port_id: &str, channel_id: &str) -> SoloResult<ChannelEnd> {
        let chain = self.enter("query_channel")?;
        chain
            .channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| SoloMachineError::not_found(format!("channel {port_id}/{channel_id}")))
    }

    async fn client_is_active(&self, client_id: &str) -> SoloResult<bool> {
        let chain = self.enter("client_is_active")?;
        let client = chain.client(client_id)?;
        Ok(!client.is_frozen && !chain.frozen.iter().any(|c| c == client_id))
    }

    async fn create_client(
        &self,
        client_state: &SoloClientState,
        consensus_state: &SoloConsensusState,
    ) -> SoloResult<String> {
        let mut chain = self.submit("create_client")?;
        if client_state.sequence == 0 || consensus_state.public_key.is_none() {
            return Err(self.rejected("create_client", "invalid solo machine client".into()));
        }
        let id = chain.next_id("06-solomachine");
        chain.clients.insert(
            id.clone(),
            SoloClientState {
                consensus_state: Some(consensus_state.clone()),
                ..client_state.clone()
            },
        );
        chain.submissions += 1;
        Ok(id)
    }

    async fn update_client(&self, client_id: &str, header: &Header) -> SoloResult<()> {
        let mut chain = self.submit("update_client")?;
        let (key, diversifier, consensus_time) = chain.verifying_key(client_id)?;
        let sequence = chain.client(client_id)?.sequence;
        if header.timestamp < consensus_time {
            return Err(self.rejected("update_client", "header timestamp decreased".into()));
        }
        let signature = SignatureData::decode(header.signature.as_slice())?;
        let signature = signature
            .signature()
            .ok_or_else(|| self.rejected("update_client", "header carries no signature".into()))?;
        let data = HeaderData {
            new_pub_key: header.new_public_key.clone(),
            new_diversifier: header.new_diversifier.clone(),
        }
        .encode_to_vec();
        verify_signature(
            &key,
            sequence,
            header.timestamp,
            &diversifier,
            SENTINEL_HEADER_PATH.as_bytes(),
            &data,
            signature,
        )
        .map_err(|e| self.rejected("update_client", e.to_string()))?;

        if let Some(client) = chain.clients.get_mut(client_id) {
            client.sequence += 1;
            client.consensus_state = Some(SoloConsensusState {
                public_key: header.new_public_key.clone(),
                diversifier: header.new_diversifier.clone(),
                timestamp: header.timestamp,
            });
        }
        chain.submissions += 1;
        Ok(())
    }

    async fn init_connection(&self, client_id: &str, counterparty_client_id: &str) -> SoloResult<String> {
        let mut chain = self.submit("init_connection")?;
        chain.client(client_id)?;
        let id = chain.next_id(IdentifierKind::Connection.prefix());
        chain.connections.insert(
            id.clone(),
            ConnectionEnd {
                client_id: client_id.to_string(),
                versions: vec![Version::default_version()],
                state: ConnectionState::Init as i32,
                counterparty: Some(ConnectionCounterparty {
                    client_id: counterparty_client_id.to_string(),
                    connection_id: String::new(),
                    prefix: Some(MerklePrefix::ibc()),
                }),
                delay_period: 0,
            },
        );
        chain.submissions += 1;
        Ok(id)
    }

    async fn connection_open_ack(&self, msg: &ConnectionOpenAck) -> SoloResult<()> {
        let call = "connection_open_ack";
        let mut chain = self.submit(call)?;
        let end = chain
            .connections
            .get(&msg.connection_id)
            .cloned()
            .ok_or_else(|| SoloMachineError::not_found(format!("connection {}", msg.connection_id)))?;
        if end.connection_state()? != ConnectionState::Init {
            return Err(self.rejected(call, "connection is not in INIT".into()));
        }
        if msg.client_state.chain_id != chain.chain_id || msg.client_state.latest() > chain.height {
            return Err(self.rejected(call, "invalid self client state".into()));
        }
        let header = chain
            .headers
            .get(&msg.consensus_height)
            .cloned()
            .ok_or_else(|| self.rejected(call, format!("no consensus state at {}", msg.consensus_height)))?;
        let local_client = end
            .counterparty
            .as_ref()
            .map(|c| c.client_id.clone())
            .unwrap_or_default();

        let proofs = [
            (
                ProofPayload::connection_try_open(
                    &msg.counterparty_connection_id,
                    &local_client,
                    &end.client_id,
                    &msg.connection_id,
                ),
                &msg.proof_try,
            ),
            (
                ProofPayload::client_state(&local_client, &msg.client_state),
                &msg.proof_client,
            ),
            (
                ProofPayload::consensus_state(&local_client, msg.consensus_height, &header.consensus_state()),
                &msg.proof_consensus,
            ),
        ];
        for (offset, (payload, proof)) in (0u64..).zip(proofs.iter()) {
            chain
                .verify(&end.client_id, offset, payload, proof)
                .map_err(|e| self.rejected(call, e))?;
        }

        chain.advance_sequence(&end.client_id, 3);
        if let Some(stored) = chain.connections.get_mut(&msg.connection_id) {
            stored.state = ConnectionState::Open as i32;
            if let Some(counterparty) = stored.counterparty.as_mut() {
                counterparty.connection_id = msg.counterparty_connection_id.clone();
            }
        }
        chain.submissions += 1;
        Ok(())
    }

    async fn init_channel(
        &self,
        connection_id: &str,
        _port_id: &str,
        version: &str,
        counterparty_port_id: &str,
    ) -> SoloResult<String> {
        let mut chain = self.submit("init_channel")?;
        if !chain.connections.contains_key(connection_id) {
            return Err(SoloMachineError::not_found(format!("connection {connection_id}")));
        }
        let id = chain.next_id(IdentifierKind::Channel.prefix());
        chain.channels.insert(
            id.clone(),
            ChannelEnd {
                state: ChannelState::Init as i32,
                ordering: Order::Unordered as i32,
                counterparty: Some(ChannelCounterparty {
                    port_id: counterparty_port_id.to_string(),
                    channel_id: String::new(),
                }),
                connection_hops: vec![connection_id.to_string()],
                version: version.to_string(),
            },
        );
        chain.submissions += 1;
        Ok(id)
    }

    async fn channel_open_ack(&self, msg: &ChannelOpenAck) -> SoloResult<()> {
        let call = "channel_open_ack";
        let mut chain = self.submit(call)?;
        let end = chain
            .channels
            .get(&msg.channel_id)
            .cloned()
            .ok_or_else(|| SoloMachineError::not_found(format!("channel {}", msg.channel_id)))?;
        if end.channel_state()? != ChannelState::Init {
            return Err(self.rejected(call, "channel is not in INIT".into()));
        }
        let hop = end.connection_hops.first().cloned().unwrap_or_default();
        let connection = chain
            .connections
            .get(&hop)
            .cloned()
            .ok_or_else(|| SoloMachineError::not_found(format!("connection {hop}")))?;
        let local_connection = connection
            .counterparty
            .as_ref()
            .map(|c| c.connection_id.clone())
            .unwrap_or_default();
        let counterparty_port = end
            .counterparty
            .as_ref()
            .map(|c| c.port_id.clone())
            .unwrap_or_default();
        let payload = ProofPayload::channel_try_open(
            &counterparty_port,
            &msg.counterparty_channel_id,
            &local_connection,
            &msg.port_id,
            &msg.channel_id,
            &msg.counterparty_version,
        );
        chain
            .verify(&connection.client_id, 0, &payload, &msg.proof_try)
            .map_err(|e| self.rejected(call, e))?;

        chain.advance_sequence(&connection.client_id, 1);
        if let Some(stored) = chain.channels.get_mut(&msg.channel_id) {
            stored.state = ChannelState::Open as i32;
            stored.version = msg.counterparty_version.clone();
            if let Some(counterparty) = stored.counterparty.as_mut() {
                counterparty.channel_id = msg.counterparty_channel_id.clone();
            }
        }
        chain.submissions += 1;
        Ok(())
    }

    async fn submit_packet(&self, packet: &Packet, proof: &[u8], _proof_height: Height) -> SoloResult<()> {
        let call = "submit_packet";
        let mut chain = self.submit(call)?;
        let end = chain
            .channels
            .get(&packet.destination_channel)
            .cloned()
            .ok_or_else(|| SoloMachineError::not_found(format!("channel {}", packet.destination_channel)))?;
        if end.channel_state()? != ChannelState::Open {
            return Err(self.rejected(call, "channel is not open".into()));
        }
        let timeout = packet.timeout_height.unwrap_or_else(Height::zero);
        if !timeout.is_zero() && timeout <= chain.height {
            return Err(self.rejected(call, "packet timed out".into()));
        }
        let hop = end.connection_hops.first().cloned().unwrap_or_default();
        let client_id = chain
            .connections
            .get(&hop)
            .map(|c| c.client_id.clone())
            .ok_or_else(|| SoloMachineError::not_found(format!("connection {hop}")))?;
        let payload = ProofPayload::packet_commitment(packet)?;
        chain
            .verify(&client_id, 0, &payload, proof)
            .map_err(|e| self.rejected(call, e))?;

        chain.advance_sequence(&client_id, 1);
        chain.packets.push(packet.clone());
        chain.submissions += 1;
        Ok(())
    }

    async fn unbonding_period(&self) -> SoloResult<Duration> {
        Ok(self.enter("unbonding_period")?.unbonding)
    }

    async fn latest_header_and_client_state(&self) -> SoloResult<(CounterpartyHeader, TmClientState)> {
        let mut chain = self.enter("latest_header_and_client_state")?;
        let height = chain.height;
        let header = chain.header_at(height);
        let client_state = build_client_state(
            &header.chain_id,
            height,
            chain.unbonding,
            &LightClientConfig::default(),
        );
        Ok((header, client_state))
    }
}
