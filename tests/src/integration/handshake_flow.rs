//! # Handshake Flow
//!
//! Drives a fresh chain link through clients, connection, channel and
//! packets against the simulated counterparty, checking what is persisted
//! after every step.

use super::harness::{Machine, CHAIN};
use shared_types::proto::ibc::{ChannelState, ConnectionState};
use shared_types::{ErrorKind, SoloMachineError, TRANSFER_PORT};
use sm_02_identity::{ChainLink, HandshakeStage};
use sm_03_proof_generator::{verify_proof, ProofPayload};
use sm_04_light_client::{
    HeaderOutcome, LightClientTracker, LineageVerifier, MockVerifier, VerificationError,
};
use sm_05_handshake::{HandshakeApi, TransferRequest};
use std::sync::Arc;

fn request(amount: u128) -> TransferRequest {
    TransferRequest {
        denom: "stake".into(),
        amount,
        sender: "solo".into(),
        receiver: "cosmos1receiver".into(),
        memo: String::new(),
    }
}

/// Identifiers in handshake order.
fn ids(link: &ChainLink) -> [Option<&str>; 6] {
    [
        link.counterparty_client_id.as_deref(),
        link.client_id.as_deref(),
        link.counterparty_connection_id.as_deref(),
        link.connection_id.as_deref(),
        link.counterparty_channel_id.as_deref(),
        link.channel_id.as_deref(),
    ]
}

/// Number of leading identifiers set; the rest must be empty.
fn filled(link: &ChainLink) -> usize {
    let ids = ids(link);
    let count = ids.iter().take_while(|id| id.is_some()).count();
    assert!(
        ids[count..].iter().all(Option::is_none),
        "later identifier set before an earlier one: {link:?}"
    );
    count
}

// =============================================================================
// STAGES
// =============================================================================

#[tokio::test]
async fn test_fresh_link_fills_identifiers_in_order() {
    let m = Machine::fresh();
    assert_eq!(filled(&m.service.record().unwrap()), 0);

    let mut stages = Vec::new();
    let mut progress = Vec::new();
    loop {
        let stage = m.service.connection_step().await.unwrap();
        stages.push(stage);
        progress.push(filled(&m.service.record().unwrap()));
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
    assert_eq!(progress, vec![2, 3, 4, 4]);
    assert!(m.service.record().unwrap().connection_open());

    loop {
        let stage = m.service.channel_step().await.unwrap();
        progress.push(filled(&m.service.record().unwrap()));
        if stage == HandshakeStage::Open {
            break;
        }
    }
    assert_eq!(&progress[4..], &[5, 6, 6]);
    let record = m.service.record().unwrap();
    assert!(record.channel_open());
    assert_eq!(record.channel_stage(), HandshakeStage::Open);
}

#[tokio::test]
async fn test_connection_ack_bundle_uses_consecutive_sequences() {
    let m = Machine::fresh();
    for _ in 0..3 {
        m.service.connection_step().await.unwrap();
    }
    let record = m.service.record().unwrap();
    let counterparty_client = record.counterparty_client_id.clone().unwrap();
    let client_id = record.client_id.clone().unwrap();

    assert_eq!(m.service.connection_step().await.unwrap(), HandshakeStage::Open);

    let acks = m.chain.connection_acks();
    assert_eq!(acks.len(), 1);
    let ack = &acks[0];
    assert_eq!(ack.counterparty_connection_id, "connection-0");
    assert!(ack.proof_height.is_zero());

    // the counterparty accepted exactly three proofs after the refresh push
    let after = m.chain.client_sequence(&counterparty_client).unwrap();
    let s = after - 3;
    assert_eq!(m.keeper.current_sequence().unwrap(), after);

    let public_key = m.keeper.public_key();
    let diversifier = m.link.diversifier();
    let try_open = ProofPayload::connection_try_open(
        &ack.counterparty_connection_id,
        &client_id,
        &counterparty_client,
        &ack.connection_id,
    );
    let client_state = ProofPayload::client_state(&client_id, &ack.client_state);
    let tracker = LightClientTracker::open(
        m.link.light_client_namespace(),
        client_id.clone(),
        Arc::new(LineageVerifier::new()),
    )
    .unwrap();
    let consensus = ProofPayload::consensus_state(
        &client_id,
        ack.consensus_height,
        &tracker.consensus_state_at(ack.consensus_height).unwrap(),
    );

    for (offset, payload, proof) in [
        (0, &try_open, &ack.proof_try),
        (1, &client_state, &ack.proof_client),
        (2, &consensus, &ack.proof_consensus),
    ] {
        verify_proof(
            &public_key,
            s + offset,
            diversifier,
            payload.path.as_bytes(),
            &payload.data,
            proof,
        )
        .unwrap();
    }
    // a proof signed for S does not pass at S+1
    assert!(verify_proof(
        &public_key,
        s + 1,
        diversifier,
        try_open.path.as_bytes(),
        &try_open.data,
        &ack.proof_try
    )
    .is_err());

    let record = m.service.record().unwrap();
    assert_eq!(record.connection_id.as_deref(), Some("connection-0"));
    assert_eq!(record.connection_state, Some(ConnectionState::Open));
}

#[tokio::test]
async fn test_channel_ack_is_a_single_proof_at_mirrored_height() {
    let m = Machine::fresh();
    m.service.link().await.unwrap();

    let acks = m.chain.channel_acks();
    assert_eq!(acks.len(), 1);
    let ack = &acks[0];
    assert_eq!(ack.port_id, TRANSFER_PORT);
    assert_eq!(ack.counterparty_channel_id, "channel-0");
    assert!(!ack.proof_height.is_zero());

    let record = m.service.record().unwrap();
    let counterparty_client = record.counterparty_client_id.unwrap();
    let s = m.chain.client_sequence(&counterparty_client).unwrap() - 1;
    let payload = ProofPayload::channel_try_open(
        TRANSFER_PORT,
        &ack.counterparty_channel_id,
        "connection-0",
        TRANSFER_PORT,
        &ack.channel_id,
        &ack.counterparty_version,
    );
    verify_proof(
        &m.keeper.public_key(),
        s,
        m.link.diversifier(),
        payload.path.as_bytes(),
        &payload.data,
        &ack.proof_try,
    )
    .unwrap();
}

// =============================================================================
// IDEMPOTENCE AND FAILURES
// =============================================================================

#[tokio::test]
async fn test_open_link_is_inert() {
    let m = Machine::fresh();
    let linked = m.service.link().await.unwrap();
    let snapshot = m.snapshot();
    let version = m.store.version();
    let root = m.store.root();
    let calls = m.chain.calls().len();
    let submissions = m.chain.submissions();

    let api: &dyn HandshakeApi = &m.service;
    assert_eq!(api.link().await.unwrap(), linked);

    assert_eq!(m.chain.calls().len(), calls);
    assert_eq!(m.chain.submissions(), submissions);
    assert_eq!(m.store.version(), version);
    assert_eq!(m.store.root(), root);
    assert_eq!(m.snapshot(), snapshot);
}

#[tokio::test]
async fn test_unexpected_remote_connection_state_changes_nothing() {
    let m = Machine::fresh();
    for _ in 0..3 {
        m.service.connection_step().await.unwrap();
    }
    m.chain.set_connection_state("connection-0", ConnectionState::Tryopen);
    let snapshot = m.snapshot();
    let submissions = m.chain.submissions();

    let err = m.service.connection_step().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolState);
    assert_eq!(m.snapshot(), snapshot);
    assert_eq!(m.chain.submissions(), submissions);
    assert_eq!(m.service.record().unwrap().connection_stage(), HandshakeStage::LocalCreated);
}

#[tokio::test]
async fn test_unexpected_remote_channel_state_changes_nothing() {
    let m = Machine::fresh();
    m.service.open_connection().await.unwrap();
    for _ in 0..2 {
        m.service.channel_step().await.unwrap();
    }
    let record = m.service.record().unwrap();
    let counterparty_channel = record.counterparty_channel_id.clone().unwrap();
    m.chain.set_channel_state(&counterparty_channel, ChannelState::Closed);
    let snapshot = m.snapshot();

    let err = m.service.channel_step().await.unwrap_err();
    assert!(matches!(err, SoloMachineError::ProtocolState { ref chain, .. } if chain == CHAIN));
    assert_eq!(m.snapshot(), snapshot);
    assert_eq!(m.service.record().unwrap(), record);
}

#[tokio::test]
async fn test_rejected_connection_init_resumes_on_retry() {
    let m = Machine::fresh();
    m.service.ensure_clients().await.unwrap();
    m.chain.reject_next_call("init_connection", "out of gas");
    let before = m.service.record().unwrap();

    let err = m.service.link().await.unwrap_err();
    assert!(matches!(err, SoloMachineError::TransactionFailed { ref raw_log, .. } if raw_log == "out of gas"));
    assert_eq!(m.service.record().unwrap(), before);

    let linked = m.service.link().await.unwrap();
    assert_eq!(linked.counterparty_client_id, before.counterparty_client_id);
    assert_eq!(linked.client_id, before.client_id);
    assert!(linked.channel_open());
}

// =============================================================================
// TRANSFER AND UPDATE
// =============================================================================

#[tokio::test]
async fn test_transfer_before_channel_is_refused() {
    let m = Machine::fresh();
    m.service.open_connection().await.unwrap();
    let version = m.store.version();
    let submissions = m.chain.submissions();

    let err = m.service.transfer(&request(10)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolState);
    assert!(err.to_string().contains("channel not found"));
    assert_eq!(m.store.version(), version);
    assert_eq!(m.chain.submissions(), submissions);
}

#[tokio::test]
async fn test_transfers_number_packets_per_link() {
    let m = Machine::fresh();
    m.service.link().await.unwrap();

    let first = m.service.transfer(&request(10)).await.unwrap();
    m.chain.advance_blocks(2);
    let second = m.service.transfer(&request(20)).await.unwrap();
    assert_eq!((first.packet_sequence, second.packet_sequence), (1, 2));
    assert_eq!(first.source_channel, "channel-0");
    assert_eq!(m.service.record().unwrap().next_packet_sequence, 3);

    let packets = m.chain.submitted_packets();
    assert_eq!(packets.len(), 2);
    let (packet, _, proof_height) = &packets[1];
    assert_eq!(packet.sequence, 2);
    assert_eq!(packet.source_port, TRANSFER_PORT);
    assert_eq!(packet.timeout_height, Some(proof_height.add_blocks(1000)));
    assert_eq!(second.timeout_height, proof_height.add_blocks(1000));
    let data = String::from_utf8(packet.data.clone()).unwrap();
    assert!(data.contains(r#""amount":"20""#));
}

#[tokio::test]
async fn test_update_moves_both_clients() {
    let m = Machine::fresh();
    m.service.link().await.unwrap();
    let status = m.service.status().await.unwrap();
    let mirrored = status.light_client_height.unwrap();

    m.chain.advance_blocks(7);
    m.clock.advance(5_000);
    let outcome = m.service.update().await.unwrap();
    let expected = m.chain.height();
    assert!(expected > mirrored);
    assert!(matches!(outcome.pulled, HeaderOutcome::Applied { height, .. } if height == expected));

    let status = m.service.status().await.unwrap();
    assert_eq!(status.light_client_height, Some(expected));
    assert_eq!(status.counterparty_sequence, Some(status.local_sequence));
    assert_eq!(status.counterparty_sequence, Some(outcome.pushed_sequence + 1));
}

#[tokio::test]
async fn test_rejected_header_leaves_mirror_untouched() {
    let verifier = Arc::new(MockVerifier::new());
    let m = Machine::with_verifier(verifier.clone());
    m.service.ensure_clients().await.unwrap();
    let before = m.service.status().await.unwrap().light_client_height;

    m.chain.advance_blocks(3);
    verifier.reject_updates_with(VerificationError::Malformed("bad commit signature".into()));
    assert!(m.service.update().await.is_err());
    assert!(!m.store.has_pending());
    assert_eq!(m.service.status().await.unwrap().light_client_height, before);

    verifier.accept_updates();
    assert!(matches!(
        m.service.update().await.unwrap().pulled,
        HeaderOutcome::Applied { .. }
    ));
}

#[tokio::test]
async fn test_frozen_counterparty_client_stops_updates() {
    let m = Machine::fresh();
    m.service.link().await.unwrap();
    let client = m.service.record().unwrap().counterparty_client_id.unwrap();
    m.chain.freeze_client(&client);

    assert!(!m.service.counterparty_client_active().await.unwrap());
    let err = m.service.update().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolState);
}
