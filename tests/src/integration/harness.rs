//! # Test Fixtures
//!
//! A [`Machine`] is one solo-machine process: a store, the identity in it,
//! one chain link and the orchestrator driving it. Dropping a machine and
//! building a new one over the same store (or store file) simulates a
//! restart; the chain client outlives both.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::proto::ibc::{ChannelEnd, ConnectionEnd, Packet};
use shared_types::proto::solomachine::{
    ClientState as SoloClientState, ConsensusState as SoloConsensusState, Header,
};
use shared_types::proto::tendermint::ClientState as TmClientState;
use shared_types::{CounterpartyHeader, Height, SoloResult};
use sm_01_protocol_store::ProtocolStore;
use sm_02_identity::{ChainLinkStore, IdentityKeeper};
use sm_03_proof_generator::MockTimeSource;
use sm_04_light_client::{LightClientVerifier, LineageVerifier};
use sm_05_handshake::{
    ChainClient, ChannelOpenAck, ConnectionOpenAck, HandshakeConfig, HandshakeService,
    MockChainClient,
};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const CHAIN: &str = "testchain";
pub const CHAIN_ID: &str = "testchain-1";
pub const GENESIS_MILLIS: u64 = 1_700_000_000_000;

// =============================================================================
// RECORDING CHAIN CLIENT
// =============================================================================

/// [`MockChainClient`] that also keeps every ack message it accepted.
pub struct RecordingChain {
    inner: MockChainClient,
    connection_acks: Mutex<Vec<ConnectionOpenAck>>,
    channel_acks: Mutex<Vec<ChannelOpenAck>>,
    packets: Mutex<Vec<(Packet, Vec<u8>, Height)>>,
}

impl RecordingChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MockChainClient::new(CHAIN_ID),
            connection_acks: Mutex::new(Vec::new()),
            channel_acks: Mutex::new(Vec::new()),
            packets: Mutex::new(Vec::new()),
        })
    }

    pub fn connection_acks(&self) -> Vec<ConnectionOpenAck> {
        self.connection_acks.lock().clone()
    }

    pub fn channel_acks(&self) -> Vec<ChannelOpenAck> {
        self.channel_acks.lock().clone()
    }

    pub fn submitted_packets(&self) -> Vec<(Packet, Vec<u8>, Height)> {
        self.packets.lock().clone()
    }
}

impl Deref for RecordingChain {
    type Target = MockChainClient;

    fn deref(&self) -> &MockChainClient {
        &self.inner
    }
}

#[async_trait]
impl ChainClient for RecordingChain {
    async fn query_client_state(&self, client_id: &str) -> SoloResult<SoloClientState> {
        self.inner.query_client_state(client_id).await
    }

    async fn query_connection(&self, connection_id: &str) -> SoloResult<ConnectionEnd> {
        self.inner.query_connection(connection_id).await
    }

    async fn query_channel(&self, port_id: &str, channel_id: &str) -> SoloResult<ChannelEnd> {
        self.inner.query_channel(port_id, channel_id).await
    }

    async fn client_is_active(&self, client_id: &str) -> SoloResult<bool> {
        self.inner.client_is_active(client_id).await
    }

    async fn create_client(
        &self,
        client_state: &SoloClientState,
        consensus_state: &SoloConsensusState,
    ) -> SoloResult<String> {
        self.inner.create_client(client_state, consensus_state).await
    }

    async fn update_client(&self, client_id: &str, header: &Header) -> SoloResult<()> {
        self.inner.update_client(client_id, header).await
    }

    async fn init_connection(&self, client_id: &str, counterparty_client_id: &str) -> SoloResult<String> {
        self.inner.init_connection(client_id, counterparty_client_id).await
    }

    async fn connection_open_ack(&self, msg: &ConnectionOpenAck) -> SoloResult<()> {
        self.inner.connection_open_ack(msg).await?;
        self.connection_acks.lock().push(msg.clone());
        Ok(())
    }

    async fn init_channel(
        &self,
        connection_id: &str,
        port_id: &str,
        version: &str,
        counterparty_port_id: &str,
    ) -> SoloResult<String> {
        self.inner
            .init_channel(connection_id, port_id, version, counterparty_port_id)
            .await
    }

    async fn channel_open_ack(&self, msg: &ChannelOpenAck) -> SoloResult<()> {
        self.inner.channel_open_ack(msg).await?;
        self.channel_acks.lock().push(msg.clone());
        Ok(())
    }

    async fn submit_packet(&self, packet: &Packet, proof: &[u8], proof_height: Height) -> SoloResult<()> {
        self.inner.submit_packet(packet, proof, proof_height).await?;
        self.packets
            .lock()
            .push((packet.clone(), proof.to_vec(), proof_height));
        Ok(())
    }

    async fn unbonding_period(&self) -> SoloResult<Duration> {
        self.inner.unbonding_period().await
    }

    async fn latest_header_and_client_state(&self) -> SoloResult<(CounterpartyHeader, TmClientState)> {
        self.inner.latest_header_and_client_state().await
    }
}

// =============================================================================
// MACHINE
// =============================================================================

/// One solo-machine process.
pub struct Machine {
    pub store: ProtocolStore,
    pub keeper: IdentityKeeper,
    pub link: ChainLinkStore,
    pub chain: Arc<RecordingChain>,
    pub clock: Arc<MockTimeSource>,
    pub service: HandshakeService<RecordingChain>,
}

impl Machine {
    /// Fresh machine on an in-memory store.
    pub fn fresh() -> Self {
        Self::boot(ProtocolStore::in_memory(), RecordingChain::new(), Arc::new(LineageVerifier::new()))
    }

    /// Fresh machine whose mirrored client uses `verifier`.
    pub fn with_verifier(verifier: Arc<dyn LightClientVerifier>) -> Self {
        Self::boot(ProtocolStore::in_memory(), RecordingChain::new(), verifier)
    }

    /// Machine on the store file at `path`, talking to `chain`.
    pub fn on_file(path: &Path, chain: Arc<RecordingChain>) -> Self {
        let store = open_file_store(path);
        Self::boot(store, chain, Arc::new(LineageVerifier::new()))
    }

    /// Wire every subsystem over `store`.
    pub fn boot(
        store: ProtocolStore,
        chain: Arc<RecordingChain>,
        verifier: Arc<dyn LightClientVerifier>,
    ) -> Self {
        let keeper = IdentityKeeper::load_or_create(&store).unwrap();
        let link = ChainLinkStore::open(&store, CHAIN).unwrap();
        let clock = Arc::new(MockTimeSource::new(GENESIS_MILLIS));
        let service = HandshakeService::new(
            HandshakeConfig::for_testing(),
            keeper.clone(),
            link.clone(),
            chain.clone(),
            verifier,
        )
        .with_time_source(clock.clone());
        Self {
            store,
            keeper,
            link,
            chain,
            clock,
            service,
        }
    }

    /// Every committed entry, for byte-level comparison.
    pub fn snapshot(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut entries = self.store.namespace("solo-machine").entries().unwrap();
        entries.extend(self.store.namespace("chains").entries().unwrap());
        entries.extend(self.link.light_client_namespace().entries().unwrap());
        entries
    }
}

pub fn open_file_store(path: &Path) -> ProtocolStore {
    ProtocolStore::open(&sm_01_protocol_store::StoreConfig::file(path)).unwrap()
}
