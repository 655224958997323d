//! # Handshake Service
//!
//! Drives one chain link from nothing to an open ICS-20 channel and sends
//! packets over it. Every operation reads the persisted link first and
//! resumes at the first missing step:
//!
//! ```text
//! clients:     CreateClient (counterparty) -> allocate + seed mirror (local)
//! connection:  push header, ConnectionOpenInit -> pull header, allocate
//!              -> ack bundle (try S, client S+1, consensus S+2)
//! channel:     push header, ChannelOpenInit -> pull header, allocate
//!              -> ack (try S)
//! transfer:    push/pull, RecvPacket (commitment S)
//! ```
//!
//! Local writes of a step are committed only after the counterparty
//! confirmed the step's submission. A failed step leaves the link exactly as
//! it was, so re-running resumes at the same place.

use crate::config::HandshakeConfig;
use crate::domain::{
    ChannelOpenAck, ConnectionOpenAck, LinkStatus, RefreshOutcome, TransferReceipt,
    TransferRequest,
};
use crate::ports::{ChainClient, HandshakeApi};
use async_trait::async_trait;
use shared_types::proto::ibc::{ChannelState, ConnectionState, Packet, Version};
use shared_types::{Height, SoloMachineError, SoloResult, ICS20_VERSION, TRANSFER_PORT};
use sm_02_identity::{ChainLink, ChainLinkStore, HandshakeStage, IdentityKeeper, LinkField};
use sm_03_proof_generator::{ProofGenerator, ProofPayload, SignedProof, TimeSource};
use sm_04_light_client::{
    build_client_state, HeaderOutcome, LightClientTracker, LightClientVerifier, TrackerStatus,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A handshake reaches `Open` in at most this many steps.
const MAX_HANDSHAKE_STEPS: usize = 5;

/// Orchestrates one chain link against counterparty `C`.
pub struct HandshakeService<C: ChainClient> {
    config: HandshakeConfig,
    link: ChainLinkStore,
    proofs: ProofGenerator,
    chain: Arc<C>,
    verifier: Arc<dyn LightClientVerifier>,
}

impl<C: ChainClient> HandshakeService<C> {
    /// Create a service for `link`, signing with `keeper`.
    pub fn new(
        config: HandshakeConfig,
        keeper: IdentityKeeper,
        link: ChainLinkStore,
        chain: Arc<C>,
        verifier: Arc<dyn LightClientVerifier>,
    ) -> Self {
        let proofs = ProofGenerator::new(keeper, link.diversifier());
        Self {
            config,
            link,
            proofs,
            chain,
            verifier,
        }
    }

    /// Stamp proofs and headers with `time` instead of system time.
    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.proofs =
            ProofGenerator::with_time_source(self.proofs.keeper().clone(), self.link.diversifier(), time);
        self
    }

    /// Chain-link name.
    pub fn chain_name(&self) -> &str {
        self.link.chain_name()
    }

    /// Committed snapshot of the link.
    pub fn record(&self) -> SoloResult<ChainLink> {
        self.link.record()
    }

    /// Counterparty handle.
    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    // =========================================================================
    // Clients
    // =========================================================================

    /// Create whichever of the two clients is missing.
    pub async fn ensure_clients(&self) -> SoloResult<()> {
        let record = self.link.record()?;
        if record.counterparty_client_id.is_none() {
            self.create_counterparty_client().await?;
        }
        if record.client_id.is_none() {
            self.create_local_client().await?;
        }
        Ok(())
    }

    async fn create_counterparty_client(&self) -> SoloResult<String> {
        let client_state = self.proofs.client_state()?;
        let consensus_state = client_state.consensus_state.clone().unwrap_or_default();
        let client_id = self.chain.create_client(&client_state, &consensus_state).await?;
        self.link.assign(LinkField::CounterpartyClientId, &client_id)?;
        self.link.commit()?;
        info!(
            chain = %self.chain_name(),
            client_id = %client_id,
            sequence = client_state.sequence,
            "counterparty client created"
        );
        Ok(client_id)
    }

    async fn create_local_client(&self) -> SoloResult<String> {
        let (header, remote) = self.chain.latest_header_and_client_state().await?;
        if remote.chain_id != header.chain_id {
            return Err(self.protocol_error(
                "create-light-client",
                format!(
                    "header chain id {} does not match client state chain id {}",
                    header.chain_id, remote.chain_id
                ),
            ));
        }
        let unbonding = self.chain.unbonding_period().await?;
        let client_state =
            build_client_state(&remote.chain_id, header.height, unbonding, &self.config.light_client);
        let client_id = self.commit_staged(|| {
            let client_id = self.link.allocate(LinkField::ClientId)?;
            self.tracker(&client_id)?
                .initialize(&client_state, &header.consensus_state())?;
            Ok(client_id)
        })?;
        info!(
            chain = %self.chain_name(),
            client_id = %client_id,
            height = %header.height,
            "mirrored light client created"
        );
        Ok(client_id)
    }

    /// Whether the counterparty reports the solo-machine client as active.
    /// `false` when no client exists yet.
    pub async fn counterparty_client_active(&self) -> SoloResult<bool> {
        match self.link.get(LinkField::CounterpartyClientId)? {
            Some(client_id) => self.chain.client_is_active(&client_id).await,
            None => Ok(false),
        }
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Push a header to the counterparty, then pull its latest header into
    /// the mirror.
    pub async fn refresh(&self) -> SoloResult<RefreshOutcome> {
        let pushed_sequence = self.push_header().await?;
        let pulled = self.pull_header().await?;
        Ok(RefreshOutcome {
            pushed_sequence,
            pulled,
        })
    }

    /// Refresh an existing link.
    pub async fn update(&self) -> SoloResult<RefreshOutcome> {
        let record = self.link.record()?;
        if record.counterparty_client_id.is_none() || record.client_id.is_none() {
            return Err(self.protocol_error("update", "clients are not created, link the chain first"));
        }
        self.refresh().await
    }

    async fn push_header(&self) -> SoloResult<u64> {
        let step = "update-counterparty-client";
        let client_id = self.link.require(LinkField::CounterpartyClientId, step)?;
        self.sync_sequence(&client_id, step).await?;
        let signed = self.proofs.build_header()?;
        self.chain.update_client(&client_id, &signed.header).await?;
        debug!(chain = %self.chain_name(), sequence = signed.sequence, "header pushed");
        Ok(signed.sequence)
    }

    async fn pull_header(&self) -> SoloResult<HeaderOutcome> {
        let step = "update-light-client";
        let client_id = self.link.require(LinkField::ClientId, step)?;
        let tracker = self.tracker(&client_id)?;
        let TrackerStatus::Initialized { latest_height } = tracker.status()? else {
            return Err(self.protocol_error(step, "mirrored light client is not initialized"));
        };
        let (mut header, _) = self.chain.latest_header_and_client_state().await?;
        header.trusted_height = latest_height;
        let outcome = self.commit_staged(|| tracker.apply_header(&header))?;
        debug!(chain = %self.chain_name(), ?outcome, "header pulled");
        Ok(outcome)
    }

    /// Align the local counter with what the counterparty's client expects
    /// next and return that sequence.
    async fn sync_sequence(&self, counterparty_client_id: &str, step: &str) -> SoloResult<u64> {
        let remote = self.chain.query_client_state(counterparty_client_id).await?;
        if remote.is_frozen {
            return Err(self.protocol_error(step, format!("client {counterparty_client_id} is frozen")));
        }
        self.proofs.keeper().sync_with_counterparty(remote.sequence)?;
        Ok(remote.sequence)
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Execute the next connection step and return the stage reached.
    /// Does nothing once the connection is open.
    pub async fn connection_step(&self) -> SoloResult<HandshakeStage> {
        let stage = self.link.record()?.connection_stage();
        match stage {
            HandshakeStage::Open => return Ok(HandshakeStage::Open),
            HandshakeStage::NoClient => self.ensure_clients().await?,
            HandshakeStage::ClientCreated => self.init_counterparty_connection().await?,
            HandshakeStage::CounterpartyInitiated => {
                self.refresh().await?;
                self.allocate_local(LinkField::ConnectionId)?;
            }
            HandshakeStage::LocalCreated => self.acknowledge_connection().await?,
        }
        let reached = self.link.record()?.connection_stage();
        info!(chain = %self.chain_name(), from = %stage, to = %reached, "connection step");
        Ok(reached)
    }

    /// Drive the connection handshake to open.
    pub async fn open_connection(&self) -> SoloResult<()> {
        for _ in 0..MAX_HANDSHAKE_STEPS {
            if self.connection_step().await? == HandshakeStage::Open {
                return Ok(());
            }
        }
        Err(self.protocol_error("connection-handshake", "handshake did not reach open"))
    }

    async fn init_counterparty_connection(&self) -> SoloResult<()> {
        let step = "connection-open-init";
        let counterparty_client_id = self.link.require(LinkField::CounterpartyClientId, step)?;
        let client_id = self.link.require(LinkField::ClientId, step)?;
        self.push_header().await?;
        let connection_id = self
            .chain
            .init_connection(&counterparty_client_id, &client_id)
            .await?;
        self.link.assign(LinkField::CounterpartyConnectionId, &connection_id)?;
        self.link.commit()?;
        Ok(())
    }

    async fn acknowledge_connection(&self) -> SoloResult<()> {
        let step = "connection-open-ack";
        let counterparty_client_id = self.link.require(LinkField::CounterpartyClientId, step)?;
        let client_id = self.link.require(LinkField::ClientId, step)?;
        let counterparty_connection_id = self.link.require(LinkField::CounterpartyConnectionId, step)?;
        let connection_id = self.link.require(LinkField::ConnectionId, step)?;

        let remote = self
            .chain
            .query_connection(&counterparty_connection_id)
            .await?
            .connection_state()?;
        match remote {
            ConnectionState::Open => {
                info!(chain = %self.chain_name(), "counterparty connection already open");
            }
            ConnectionState::Init => {
                self.refresh().await?;
                let tracker = self.tracker(&client_id)?;
                let client_state = tracker.current_client_state()?;
                let consensus_height = client_state.latest();
                let consensus_state = tracker.consensus_state_at(consensus_height)?;

                let base = self.sync_sequence(&counterparty_client_id, step).await?;
                let proof_try = self.proofs.prove(&ProofPayload::connection_try_open(
                    &connection_id,
                    &client_id,
                    &counterparty_client_id,
                    &counterparty_connection_id,
                ))?;
                let proof_client = self
                    .proofs
                    .prove(&ProofPayload::client_state(&client_id, &client_state))?;
                let proof_consensus = self.proofs.prove(&ProofPayload::consensus_state(
                    &client_id,
                    consensus_height,
                    &consensus_state,
                ))?;
                self.check_bundle(step, base, &[&proof_try, &proof_client, &proof_consensus])?;

                self.chain
                    .connection_open_ack(&ConnectionOpenAck {
                        connection_id: counterparty_connection_id.clone(),
                        counterparty_connection_id: connection_id.clone(),
                        client_state,
                        proof_try: proof_try.proof,
                        proof_client: proof_client.proof,
                        proof_consensus: proof_consensus.proof,
                        proof_height: Height::zero(),
                        consensus_height,
                        version: Version::default_version(),
                    })
                    .await?;
            }
            other => {
                return Err(self.protocol_error(
                    step,
                    format!(
                        "counterparty connection {counterparty_connection_id} is {}",
                        other.as_str_name()
                    ),
                ))
            }
        }
        self.link.set_connection_state(ConnectionState::Open)?;
        self.link.commit()?;
        info!(chain = %self.chain_name(), %connection_id, %counterparty_connection_id, "connection open");
        Ok(())
    }

    // =========================================================================
    // Channel
    // =========================================================================

    /// Execute the next channel step and return the stage reached.
    /// Requires an open connection; does nothing once the channel is open.
    pub async fn channel_step(&self) -> SoloResult<HandshakeStage> {
        let stage = self.link.record()?.channel_stage();
        match stage {
            HandshakeStage::Open => return Ok(HandshakeStage::Open),
            HandshakeStage::NoClient => {
                return Err(self.protocol_error("channel-handshake", "connection is not open"))
            }
            HandshakeStage::ClientCreated => self.init_counterparty_channel().await?,
            HandshakeStage::CounterpartyInitiated => {
                self.refresh().await?;
                self.allocate_local(LinkField::ChannelId)?;
            }
            HandshakeStage::LocalCreated => self.acknowledge_channel().await?,
        }
        let reached = self.link.record()?.channel_stage();
        info!(chain = %self.chain_name(), from = %stage, to = %reached, "channel step");
        Ok(reached)
    }

    /// Drive the channel handshake to open.
    pub async fn open_channel(&self) -> SoloResult<()> {
        for _ in 0..MAX_HANDSHAKE_STEPS {
            if self.channel_step().await? == HandshakeStage::Open {
                return Ok(());
            }
        }
        Err(self.protocol_error("channel-handshake", "handshake did not reach open"))
    }

    async fn init_counterparty_channel(&self) -> SoloResult<()> {
        let step = "channel-open-init";
        let counterparty_connection_id = self.link.require(LinkField::CounterpartyConnectionId, step)?;
        self.push_header().await?;
        let channel_id = self
            .chain
            .init_channel(&counterparty_connection_id, TRANSFER_PORT, ICS20_VERSION, TRANSFER_PORT)
            .await?;
        self.link.assign(LinkField::CounterpartyChannelId, &channel_id)?;
        self.link.commit()?;
        Ok(())
    }

    async fn acknowledge_channel(&self) -> SoloResult<()> {
        let step = "channel-open-ack";
        let counterparty_client_id = self.link.require(LinkField::CounterpartyClientId, step)?;
        let client_id = self.link.require(LinkField::ClientId, step)?;
        let connection_id = self.link.require(LinkField::ConnectionId, step)?;
        let counterparty_channel_id = self.link.require(LinkField::CounterpartyChannelId, step)?;
        let channel_id = self.link.require(LinkField::ChannelId, step)?;

        let remote = self
            .chain
            .query_channel(TRANSFER_PORT, &counterparty_channel_id)
            .await?
            .channel_state()?;
        match remote {
            ChannelState::Open => {
                info!(chain = %self.chain_name(), "counterparty channel already open");
            }
            ChannelState::Init => {
                self.refresh().await?;
                let proof_height = self.tracker(&client_id)?.current_client_state()?.latest();
                let base = self.sync_sequence(&counterparty_client_id, step).await?;
                let proof_try = self.proofs.prove(&ProofPayload::channel_try_open(
                    TRANSFER_PORT,
                    &channel_id,
                    &connection_id,
                    TRANSFER_PORT,
                    &counterparty_channel_id,
                    ICS20_VERSION,
                ))?;
                self.check_bundle(step, base, &[&proof_try])?;

                self.chain
                    .channel_open_ack(&ChannelOpenAck {
                        port_id: TRANSFER_PORT.to_string(),
                        channel_id: counterparty_channel_id.clone(),
                        counterparty_channel_id: channel_id.clone(),
                        counterparty_version: ICS20_VERSION.to_string(),
                        proof_try: proof_try.proof,
                        proof_height,
                    })
                    .await?;
            }
            other => {
                return Err(self.protocol_error(
                    step,
                    format!(
                        "counterparty channel {counterparty_channel_id} is {}",
                        other.as_str_name()
                    ),
                ))
            }
        }
        self.link.set_channel_state(ChannelState::Open)?;
        self.link.commit()?;
        info!(chain = %self.chain_name(), %channel_id, %counterparty_channel_id, "channel open");
        Ok(())
    }

    // =========================================================================
    // Link, transfer, status
    // =========================================================================

    /// Clients, connection and channel, each resumed where it stopped.
    pub async fn link(&self) -> SoloResult<ChainLink> {
        self.ensure_clients().await?;
        self.open_connection().await?;
        self.open_channel().await?;
        let record = self.link.record()?;
        info!(
            chain = %self.chain_name(),
            connection = ?record.connection_id,
            channel = ?record.channel_id,
            "chain linked"
        );
        Ok(record)
    }

    /// Send an ICS-20 packet to the counterparty.
    pub async fn transfer(&self, request: &TransferRequest) -> SoloResult<TransferReceipt> {
        let step = "transfer";
        let record = self.link.record()?;
        if !record.channel_open() {
            return Err(self.protocol_error(step, "channel not found, link the chain first"));
        }
        let data = request.packet_data()?.to_bytes()?;
        let counterparty_client_id = self.link.require(LinkField::CounterpartyClientId, step)?;
        let client_id = self.link.require(LinkField::ClientId, step)?;
        let channel_id = self.link.require(LinkField::ChannelId, step)?;
        let counterparty_channel_id = self.link.require(LinkField::CounterpartyChannelId, step)?;

        self.refresh().await?;
        let proof_height = self.tracker(&client_id)?.current_client_state()?.latest();
        let timeout_height = proof_height.add_blocks(self.config.transfer_timeout_blocks);
        let packet_sequence = self.link.packet_sequence()?;
        let packet = Packet {
            sequence: packet_sequence,
            source_port: TRANSFER_PORT.to_string(),
            source_channel: channel_id.clone(),
            destination_port: TRANSFER_PORT.to_string(),
            destination_channel: counterparty_channel_id.clone(),
            data,
            timeout_height: Some(timeout_height),
            timeout_timestamp: 0,
        };

        self.sync_sequence(&counterparty_client_id, step).await?;
        let proof = self.proofs.prove(&ProofPayload::packet_commitment(&packet)?)?;
        self.chain
            .submit_packet(&packet, &proof.proof, proof_height)
            .await?;
        self.link.record_packet_sent(packet_sequence)?;
        self.link.commit()?;

        info!(
            chain = %self.chain_name(),
            packet_sequence,
            proof_sequence = proof.sequence,
            denom = %request.denom,
            amount = request.amount,
            "packet sent"
        );
        Ok(TransferReceipt {
            packet_sequence,
            proof_sequence: proof.sequence,
            source_channel: channel_id,
            destination_channel: counterparty_channel_id,
            timeout_height,
        })
    }

    /// Local records next to the counterparty's view. Read-only on both
    /// sides.
    pub async fn status(&self) -> SoloResult<LinkStatus> {
        let record = self.link.record()?;
        let mut status = LinkStatus::from_record(&record, self.proofs.keeper().current_sequence()?);

        if let Some(client_id) = &record.client_id {
            if let TrackerStatus::Initialized { latest_height } = self.tracker(client_id)?.status()? {
                status.light_client_height = Some(latest_height);
            }
            status.counterparty_height = Some(self.chain.latest_header_and_client_state().await?.0.height);
        }
        if let Some(client_id) = &record.counterparty_client_id {
            status.counterparty_sequence = Some(self.chain.query_client_state(client_id).await?.sequence);
            status.counterparty_client_active = Some(self.chain.client_is_active(client_id).await?);
        }
        if let Some(connection_id) = &record.counterparty_connection_id {
            let state = self.chain.query_connection(connection_id).await?.connection_state()?;
            status.counterparty_connection_state = Some(state.as_str_name().to_string());
        }
        if let Some(channel_id) = &record.counterparty_channel_id {
            let state = self
                .chain
                .query_channel(TRANSFER_PORT, channel_id)
                .await?
                .channel_state()?;
            status.counterparty_channel_state = Some(state.as_str_name().to_string());
        }
        Ok(status)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn tracker(&self, client_id: &str) -> SoloResult<LightClientTracker> {
        LightClientTracker::open(
            self.link.light_client_namespace(),
            client_id,
            self.verifier.clone(),
        )
    }

    fn allocate_local(&self, field: LinkField) -> SoloResult<String> {
        let id = self.commit_staged(|| self.link.allocate(field))?;
        debug!(chain = %self.chain_name(), field = field.key(), %id, "local identifier allocated");
        Ok(id)
    }

    /// Run `stage`, committing what it staged on success and dropping it on
    /// failure.
    fn commit_staged<T>(&self, stage: impl FnOnce() -> SoloResult<T>) -> SoloResult<T> {
        match stage() {
            Ok(value) => {
                self.link.commit()?;
                Ok(value)
            }
            Err(e) => {
                self.link.discard();
                Err(e)
            }
        }
    }

    /// Proofs of one submission must carry consecutive sequences from the
    /// counterparty's expected value.
    fn check_bundle(&self, step: &str, base: u64, proofs: &[&SignedProof]) -> SoloResult<()> {
        for (expected, proof) in (base..).zip(proofs) {
            if proof.sequence != expected {
                warn!(step, expected, actual = proof.sequence, kind = %proof.kind, "sequence gap in bundle");
                return Err(self.protocol_error(
                    step,
                    format!("{} proof signed at {} instead of {expected}", proof.kind, proof.sequence),
                ));
            }
        }
        Ok(())
    }

    fn protocol_error(&self, step: &str, reason: impl Into<String>) -> SoloMachineError {
        SoloMachineError::protocol_state(self.chain_name(), step, reason)
    }
}

#[async_trait]
impl<C: ChainClient> HandshakeApi for HandshakeService<C> {
    async fn link(&self) -> SoloResult<ChainLink> {
        HandshakeService::link(self).await
    }

    async fn update(&self) -> SoloResult<RefreshOutcome> {
        HandshakeService::update(self).await
    }

    async fn transfer(&self, request: &TransferRequest) -> SoloResult<TransferReceipt> {
        HandshakeService::transfer(self, request).await
    }

    async fn status(&self) -> SoloResult<LinkStatus> {
        HandshakeService::status(self).await
    }
}

impl<C: ChainClient> std::fmt::Debug for HandshakeService<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeService")
            .field("chain", &self.chain_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockChainClient;
    use proptest::prelude::*;
    use shared_types::ErrorKind;
    use sm_01_protocol_store::ProtocolStore;
    use sm_03_proof_generator::MockTimeSource;
    use sm_04_light_client::{LineageVerifier, MockVerifier, VerificationError};

    const CHAIN: &str = "testchain";
    const CHAIN_ID: &str = "testchain-1";

    struct Harness {
        store: ProtocolStore,
        chain: Arc<MockChainClient>,
        clock: Arc<MockTimeSource>,
        service: HandshakeService<MockChainClient>,
    }

    fn harness_with(verifier: Arc<dyn LightClientVerifier>) -> Harness {
        let store = ProtocolStore::in_memory();
        let keeper = IdentityKeeper::load_or_create(&store).unwrap();
        let link = ChainLinkStore::open(&store, CHAIN).unwrap();
        let chain = Arc::new(MockChainClient::new(CHAIN_ID));
        let clock = Arc::new(MockTimeSource::new(1_700_000_000_000));
        let service = HandshakeService::new(
            HandshakeConfig::for_testing(),
            keeper,
            link,
            chain.clone(),
            verifier,
        )
        .with_time_source(clock.clone());
        Harness {
            store,
            chain,
            clock,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(LineageVerifier::new()))
    }

    fn request() -> TransferRequest {
        TransferRequest {
            denom: "stake".into(),
            amount: 100,
            sender: "solo-machine".into(),
            receiver: "cosmos1receiver".into(),
            memo: String::new(),
        }
    }

    #[tokio::test]
    async fn test_ensure_clients_creates_both() {
        let h = harness();
        h.service.ensure_clients().await.unwrap();
        let record = h.service.record().unwrap();
        assert_eq!(record.counterparty_client_id.as_deref(), Some("06-solomachine-0"));
        assert_eq!(record.client_id.as_deref(), Some("07-tendermint-0"));
        assert_eq!(h.chain.client_sequence("06-solomachine-0"), Some(1));

        // second run submits nothing
        let before = h.chain.submissions();
        h.service.ensure_clients().await.unwrap();
        assert_eq!(h.chain.submissions(), before);
    }

    #[tokio::test]
    async fn test_refresh_advances_both_sides() {
        let h = harness();
        h.service.ensure_clients().await.unwrap();
        h.chain.advance_blocks(3);
        h.clock.advance(1_000);
        let outcome = h.service.refresh().await.unwrap();
        assert_eq!(outcome.pushed_sequence, 1);
        assert_eq!(h.chain.client_sequence("06-solomachine-0"), Some(2));
        assert_eq!(
            outcome.pulled,
            HeaderOutcome::Applied {
                height: Height::new(1, 13),
                latest_height: Height::new(1, 13),
            }
        );

        // no new blocks: pull is a no-op, push still consumes a sequence
        let again = h.service.refresh().await.unwrap();
        assert_eq!(again.pushed_sequence, 2);
        assert_eq!(again.pulled, HeaderOutcome::Unchanged(Height::new(1, 13)));
    }

    #[tokio::test]
    async fn test_connection_steps_visit_every_stage() {
        let h = harness();
        let mut stages = Vec::new();
        loop {
            let stage = h.service.connection_step().await.unwrap();
            stages.push(stage);
            if stage == HandshakeStage::Open {
                break;
            }
        }
        assert_eq!(
            stages,
            vec![
                HandshakeStage::ClientCreated,
                HandshakeStage::CounterpartyInitiated,
                HandshakeStage::LocalCreated,
                HandshakeStage::Open,
            ]
        );
        let end = h.chain.connection("connection-0").unwrap();
        assert_eq!(end.connection_state().unwrap(), ConnectionState::Open);
        assert_eq!(end.counterparty.unwrap().connection_id, "connection-0");
    }

    #[tokio::test]
    async fn test_connection_ack_consumes_three_sequences() {
        let h = harness();
        for _ in 0..3 {
            h.service.connection_step().await.unwrap();
        }
        let before = h.chain.client_sequence("06-solomachine-0").unwrap();
        assert_eq!(h.service.connection_step().await.unwrap(), HandshakeStage::Open);
        // one header push for the refresh, then the three-proof bundle
        assert_eq!(h.chain.client_sequence("06-solomachine-0").unwrap(), before + 4);
        assert_eq!(
            h.store.namespace("solo-machine").get_u64("sequence").unwrap(),
            Some(before + 4)
        );
    }

    #[tokio::test]
    async fn test_open_link_is_a_no_op() {
        let h = harness();
        h.service.link().await.unwrap();
        let calls = h.chain.calls().len();
        let version = h.store.version();
        assert_eq!(h.service.connection_step().await.unwrap(), HandshakeStage::Open);
        assert_eq!(h.service.channel_step().await.unwrap(), HandshakeStage::Open);
        assert_eq!(h.chain.calls().len(), calls);
        assert_eq!(h.store.version(), version);
    }

    #[tokio::test]
    async fn test_ack_against_unexpected_remote_state_fails_cleanly() {
        let h = harness();
        for _ in 0..3 {
            h.service.connection_step().await.unwrap();
        }
        h.chain.set_connection_state("connection-0", ConnectionState::Tryopen);
        let before = h.service.record().unwrap();
        let err = h.service.connection_step().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolState);
        assert!(err.to_string().contains("STATE_TRYOPEN"));
        assert_eq!(h.service.record().unwrap(), before);
    }

    #[tokio::test]
    async fn test_remote_already_open_skips_ack() {
        let h = harness();
        for _ in 0..3 {
            h.service.connection_step().await.unwrap();
        }
        h.chain.set_connection_state("connection-0", ConnectionState::Open);
        let submissions = h.chain.submissions();
        assert_eq!(h.service.connection_step().await.unwrap(), HandshakeStage::Open);
        assert_eq!(h.chain.submissions(), submissions);
    }

    #[tokio::test]
    async fn test_rejected_submission_leaves_link_unchanged() {
        let h = harness();
        h.service.ensure_clients().await.unwrap();
        let before = h.service.record().unwrap();
        h.chain.reject_next_call("init_connection", "connection open init failed");
        let err = h.service.connection_step().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert_eq!(h.service.record().unwrap(), before);
        assert!(h.chain.connection("connection-0").is_none());

        // re-running resumes at the same step
        assert_eq!(
            h.service.connection_step().await.unwrap(),
            HandshakeStage::CounterpartyInitiated
        );
    }

    #[tokio::test]
    async fn test_channel_requires_open_connection() {
        let h = harness();
        h.service.ensure_clients().await.unwrap();
        let err = h.service.channel_step().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolState);
    }

    #[tokio::test]
    async fn test_link_opens_channel() {
        let h = harness();
        let record = h.service.link().await.unwrap();
        assert!(record.connection_open());
        assert!(record.channel_open());
        assert_eq!(record.channel_id.as_deref(), Some("channel-0"));
        assert_eq!(record.counterparty_channel_id.as_deref(), Some("channel-0"));
        let end = h.chain.channel("channel-0").unwrap();
        assert_eq!(end.channel_state().unwrap(), ChannelState::Open);
        assert_eq!(end.version, ICS20_VERSION);
    }

    #[tokio::test]
    async fn test_transfer_sends_packet() {
        let h = harness();
        h.service.link().await.unwrap();
        h.chain.advance_blocks(2);
        let receipt = h.service.transfer(&request()).await.unwrap();
        assert_eq!(receipt.packet_sequence, 1);
        let packets = h.chain.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].destination_channel, "channel-0");
        assert_eq!(
            packets[0].timeout_height,
            Some(h.chain.height().add_blocks(1000))
        );
        assert_eq!(receipt.timeout_height, h.chain.height().add_blocks(1000));

        let second = h.service.transfer(&request()).await.unwrap();
        assert_eq!(second.packet_sequence, 2);
        assert!(second.proof_sequence > receipt.proof_sequence);
    }

    #[tokio::test]
    async fn test_transfer_without_channel_fails_without_side_effects() {
        let h = harness();
        let version = h.store.version();
        let err = h.service.transfer(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolState);
        assert!(h.chain.calls().is_empty());
        assert_eq!(h.store.version(), version);
    }

    #[tokio::test]
    async fn test_rejected_packet_keeps_packet_sequence() {
        let h = harness();
        h.service.link().await.unwrap();
        h.chain.reject_next_call("submit_packet", "packet rejected");
        let err = h.service.transfer(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert_eq!(h.service.record().unwrap().next_packet_sequence, 1);
        assert!(h.chain.packets().is_empty());

        // the burned proof sequence is rewound to the counterparty's value
        let receipt = h.service.transfer(&request()).await.unwrap();
        assert_eq!(receipt.packet_sequence, 1);
        assert_eq!(h.chain.packets().len(), 1);
    }

    #[tokio::test]
    async fn test_local_sequence_ahead_is_rewound() {
        let h = harness();
        h.service.ensure_clients().await.unwrap();
        // signatures that never reach the counterparty
        let keeper = IdentityKeeper::load(&h.store).unwrap();
        keeper.next_sequence().unwrap();
        keeper.next_sequence().unwrap();
        let outcome = h.service.update().await.unwrap();
        assert_eq!(outcome.pushed_sequence, 1);
        assert_eq!(h.chain.client_sequence("06-solomachine-0"), Some(2));
    }

    #[tokio::test]
    async fn test_update_requires_clients() {
        let h = harness();
        let err = h.service.update().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolState);
    }

    #[tokio::test]
    async fn test_verifier_rejection_discards_pull() {
        let verifier = Arc::new(MockVerifier::new());
        let h = harness_with(verifier.clone());
        h.service.ensure_clients().await.unwrap();
        h.chain.advance_blocks(1);
        verifier.reject_updates_with(VerificationError::Malformed("bad commit".into()));
        assert!(h.service.refresh().await.is_err());
        assert!(!h.store.has_pending());
        verifier.accept_updates();
        let outcome = h.service.refresh().await.unwrap();
        assert!(matches!(outcome.pulled, HeaderOutcome::Applied { .. }));
    }

    #[tokio::test]
    async fn test_status_reports_both_sides() {
        let h = harness();
        h.service.link().await.unwrap();
        h.chain.advance_blocks(4);
        let status = h.service.status().await.unwrap();
        assert_eq!(status.connection_state.as_deref(), Some("STATE_OPEN"));
        assert_eq!(status.counterparty_connection_state.as_deref(), Some("STATE_OPEN"));
        assert_eq!(status.counterparty_channel_state.as_deref(), Some("STATE_OPEN"));
        assert_eq!(status.counterparty_client_active, Some(true));
        assert_eq!(status.counterparty_sequence, Some(status.local_sequence));
        assert!(status.counterparty_height > status.light_client_height);
        assert!(h.service.counterparty_client_active().await.unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_refreshes_keep_both_sides_aligned(advances in prop::collection::vec(0u64..20, 1..6)) {
            tokio_test::block_on(async {
                let h = harness();
                h.service.ensure_clients().await.unwrap();
                for blocks in &advances {
                    h.chain.advance_blocks(*blocks);
                    h.clock.advance(1_000);
                    h.service.refresh().await.unwrap();
                }
                let remote = h.chain.client_sequence("06-solomachine-0").unwrap();
                let keeper = IdentityKeeper::load(&h.store).unwrap();
                assert_eq!(keeper.current_sequence().unwrap(), remote);
                let status = h.service.status().await.unwrap();
                assert_eq!(status.light_client_height, Some(h.chain.height()));
            });
        }
    }
}
