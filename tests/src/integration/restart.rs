//! # Restart Flows
//!
//! A machine dropped at any point and rebuilt over the same store file keeps
//! its identity, never reuses a sequence and resumes an interrupted link
//! where it stopped.

use super::harness::{open_file_store, Machine, RecordingChain};
use proptest::prelude::*;
use shared_types::SoloMachineError;
use sm_02_identity::{HandshakeStage, IdentityKeeper, SequenceSync};

// =============================================================================
// SEQUENCES
// =============================================================================

/// Draw `draws[i]` sequences in the i-th process lifetime.
fn draw_across_restarts(draws: &[usize]) -> Vec<u64> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solo.db");
    let mut seen = Vec::new();
    for &count in draws {
        let store = open_file_store(&path);
        let keeper = IdentityKeeper::load_or_create(&store).unwrap();
        for _ in 0..count {
            seen.push(keeper.next_sequence().unwrap());
        }
    }
    seen
}

#[test]
fn test_sequences_continue_after_restart() {
    let seen = draw_across_restarts(&[3, 0, 2, 1]);
    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
}

proptest! {
    #[test]
    fn prop_sequences_strictly_increase_without_gaps(
        draws in prop::collection::vec(0usize..8, 1..6)
    ) {
        let seen = draw_across_restarts(&draws);
        let expected: Vec<u64> = (1..=seen.len() as u64).collect();
        prop_assert_eq!(seen, expected);
    }
}

#[test]
fn test_identity_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solo.db");
    let chain = RecordingChain::new();

    let (public_key, diversifier) = {
        let m = Machine::on_file(&path, chain.clone());
        (m.keeper.public_key(), m.link.diversifier().to_string())
    };
    let m = Machine::on_file(&path, chain);
    assert_eq!(m.keeper.public_key(), public_key);
    assert_eq!(m.link.diversifier(), diversifier);
}

// =============================================================================
// LINK
// =============================================================================

#[tokio::test]
async fn test_interrupted_link_resumes_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solo.db");
    let chain = RecordingChain::new();

    let interrupted = {
        let m = Machine::on_file(&path, chain.clone());
        m.service.open_connection().await.unwrap();
        chain.reject_next_call("init_channel", "insufficient fees");
        let err = m.service.link().await.unwrap_err();
        assert!(matches!(err, SoloMachineError::TransactionFailed { .. }));
        m.service.record().unwrap()
    };
    assert!(interrupted.connection_open());
    assert_eq!(interrupted.channel_stage(), HandshakeStage::ClientCreated);

    let m = Machine::on_file(&path, chain.clone());
    assert_eq!(m.service.record().unwrap(), interrupted);
    let linked = m.service.link().await.unwrap();

    assert_eq!(linked.diversifier, interrupted.diversifier);
    assert_eq!(linked.client_id, interrupted.client_id);
    assert_eq!(linked.counterparty_client_id, interrupted.counterparty_client_id);
    assert_eq!(linked.connection_id, interrupted.connection_id);
    assert_eq!(linked.counterparty_connection_id, interrupted.counterparty_connection_id);
    assert!(linked.channel_open());
    assert_eq!(chain.connection_acks().len(), 1);
    assert_eq!(chain.channel_acks().len(), 1);
}

#[tokio::test]
async fn test_burned_sequences_are_rewound_on_update() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solo.db");
    let chain = RecordingChain::new();

    let client_id = {
        let m = Machine::on_file(&path, chain.clone());
        m.service.link().await.unwrap();
        // signatures that never reached the counterparty
        for _ in 0..3 {
            m.keeper.next_sequence().unwrap();
        }
        m.service.record().unwrap().counterparty_client_id.unwrap()
    };
    let remote = chain.client_sequence(&client_id).unwrap();

    let m = Machine::on_file(&path, chain.clone());
    assert_eq!(m.keeper.current_sequence().unwrap(), remote + 3);

    let outcome = m.service.update().await.unwrap();
    assert_eq!(outcome.pushed_sequence, remote);
    assert_eq!(chain.client_sequence(&client_id), Some(remote + 1));
    assert_eq!(m.keeper.current_sequence().unwrap(), remote + 1);
    assert_eq!(
        m.keeper.sync_with_counterparty(remote + 1).unwrap(),
        SequenceSync::InSync(remote + 1)
    );
}

#[tokio::test]
async fn test_transfers_keep_numbering_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solo.db");
    let chain = RecordingChain::new();
    let request = sm_05_handshake::TransferRequest {
        denom: "stake".into(),
        amount: 5,
        sender: "solo".into(),
        receiver: "cosmos1receiver".into(),
        memo: String::new(),
    };

    {
        let m = Machine::on_file(&path, chain.clone());
        m.service.link().await.unwrap();
        assert_eq!(m.service.transfer(&request).await.unwrap().packet_sequence, 1);
    }
    let m = Machine::on_file(&path, chain.clone());
    chain.reject_next_call("submit_packet", "packet rejected");
    assert!(m.service.transfer(&request).await.is_err());
    assert_eq!(m.service.transfer(&request).await.unwrap().packet_sequence, 2);

    let sequences: Vec<u64> = chain.packets().iter().map(|p| p.sequence).collect();
    assert_eq!(sequences, vec![1, 2]);
}
