//! # Proof Verification
//!
//! Proofs produced by the generator verify against the machine's public key
//! at exactly the fields they were signed over, and keep verifying after the
//! key is reloaded from disk.

use super::harness::{open_file_store, GENESIS_MILLIS};
use shared_types::paths;
use sm_01_protocol_store::ProtocolStore;
use sm_02_identity::IdentityKeeper;
use sm_03_proof_generator::{
    decode_proof, verify_proof, verify_signature, MockTimeSource, ProofGenerator, ProofPayload,
    SignedProof,
};
use std::sync::Arc;

const DIVERSIFIER: &str = "qwertyuiopasdfg";

fn generator(keeper: IdentityKeeper) -> ProofGenerator {
    ProofGenerator::with_time_source(
        keeper,
        DIVERSIFIER,
        Arc::new(MockTimeSource::new(GENESIS_MILLIS)),
    )
}

fn try_open_payload() -> ProofPayload {
    ProofPayload::connection_try_open(
        "connection-0",
        "07-tendermint-0",
        "06-solomachine-0",
        "connection-3",
    )
}

fn verifies(
    keeper: &IdentityKeeper,
    sequence: u64,
    diversifier: &str,
    payload: &ProofPayload,
    proof: &[u8],
) -> bool {
    verify_proof(
        &keeper.public_key(),
        sequence,
        diversifier,
        payload.path.as_bytes(),
        &payload.data,
        proof,
    )
    .is_ok()
}

#[test]
fn test_built_proof_verifies_at_its_fields() {
    let store = ProtocolStore::in_memory();
    let keeper = IdentityKeeper::load_or_create(&store).unwrap();
    let proofs = generator(keeper.clone());
    let payload = try_open_payload();

    let proof = proofs.build_proof(42, payload.path.as_bytes(), &payload.data).unwrap();
    assert!(verifies(&keeper, 42, DIVERSIFIER, &payload, &proof));
    // build_proof does not touch the counter
    assert_eq!(keeper.current_sequence().unwrap(), 1);

    let (timestamp, _) = decode_proof(&proof).unwrap();
    assert_eq!(timestamp, GENESIS_MILLIS);
}

#[test]
fn test_any_changed_field_fails() {
    let store = ProtocolStore::in_memory();
    let keeper = IdentityKeeper::load_or_create(&store).unwrap();
    let proofs = generator(keeper.clone());
    let payload = try_open_payload();
    let proof = proofs.build_proof(7, payload.path.as_bytes(), &payload.data).unwrap();

    assert!(!verifies(&keeper, 8, DIVERSIFIER, &payload, &proof));
    assert!(!verifies(&keeper, 7, "zzzzzzzzzzzzzzz", &payload, &proof));

    let other_path = ProofPayload {
        path: paths::connection_path("connection-1"),
        ..payload.clone()
    };
    assert!(!verifies(&keeper, 7, DIVERSIFIER, &other_path, &proof));

    let mut other_data = payload.clone();
    other_data.data.push(0);
    assert!(!verifies(&keeper, 7, DIVERSIFIER, &other_data, &proof));

    // same signature presented with a different timestamp
    let (timestamp, signature) = decode_proof(&proof).unwrap();
    let public_key = keeper.public_key();
    let check = |ts: u64| {
        verify_signature(
            &public_key,
            7,
            ts,
            DIVERSIFIER,
            payload.path.as_bytes(),
            &payload.data,
            &signature,
        )
    };
    assert!(check(timestamp).is_ok());
    assert!(check(timestamp + 1).is_err());

    // and under someone else's key
    let stranger = IdentityKeeper::load_or_create(&ProtocolStore::in_memory()).unwrap();
    assert!(!verifies(&stranger, 7, DIVERSIFIER, &payload, &proof));
}

#[test]
fn test_prove_consumes_consecutive_sequences() {
    let store = ProtocolStore::in_memory();
    let keeper = IdentityKeeper::load_or_create(&store).unwrap();
    let proofs = generator(keeper.clone());
    let payload = try_open_payload();

    let signed: Vec<SignedProof> = (0..3).map(|_| proofs.prove(&payload).unwrap()).collect();
    let sequences: Vec<u64> = signed.iter().map(|p| p.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    for proof in &signed {
        assert!(verifies(&keeper, proof.sequence, DIVERSIFIER, &payload, &proof.proof));
        assert_eq!(proof.timestamp, GENESIS_MILLIS);
    }
    assert_eq!(keeper.current_sequence().unwrap(), 4);
}

#[test]
fn test_reloaded_key_verifies_earlier_proofs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solo.db");
    let payload = try_open_payload();

    let (public_key, signed) = {
        let store = open_file_store(&path);
        let keeper = IdentityKeeper::load_or_create(&store).unwrap();
        let signed = generator(keeper.clone()).prove(&payload).unwrap();
        (keeper.public_key(), signed)
    };

    let store = open_file_store(&path);
    let keeper = IdentityKeeper::load(&store).unwrap();
    assert_eq!(keeper.public_key(), public_key);
    assert!(verifies(&keeper, signed.sequence, DIVERSIFIER, &payload, &signed.proof));
    assert_eq!(keeper.current_sequence().unwrap(), signed.sequence + 1);
}
