//! # Sign Bytes
//!
//! The canonical record a solo machine signs, and the inverse check the
//! counterparty's solo-machine client performs on a proof.

use prost::Message;
use shared_crypto::{Secp256k1PublicKey, Secp256k1Signature};
use shared_types::proto::cosmos::SignatureData;
use shared_types::proto::solomachine::{SignBytes, TimestampedSignatureData};
use shared_types::{SoloMachineError, SoloResult};

/// Protobuf encoding of `SignBytes`, fields in tag order.
pub fn encode_sign_bytes(
    sequence: u64,
    timestamp: u64,
    diversifier: &str,
    path: &[u8],
    data: &[u8],
) -> Vec<u8> {
    SignBytes {
        sequence,
        timestamp,
        diversifier: diversifier.to_string(),
        path: path.to_vec(),
        data: data.to_vec(),
    }
    .encode_to_vec()
}

/// Decode a proof envelope into its timestamp and raw 64-byte signature.
pub fn decode_proof(proof: &[u8]) -> SoloResult<(u64, Vec<u8>)> {
    let envelope = TimestampedSignatureData::decode(proof)?;
    let data = SignatureData::decode(envelope.signature_data.as_slice())?;
    let signature = data
        .signature()
        .ok_or_else(|| SoloMachineError::serialization("proof carries no single signature"))?;
    Ok((envelope.timestamp, signature.to_vec()))
}

/// Check `proof` over `(sequence, diversifier, path, data)` against
/// `public_key`, using the timestamp carried in the envelope.
pub fn verify_proof(
    public_key: &Secp256k1PublicKey,
    sequence: u64,
    diversifier: &str,
    path: &[u8],
    data: &[u8],
    proof: &[u8],
) -> SoloResult<()> {
    let (timestamp, signature) = decode_proof(proof)?;
    verify_signature(public_key, sequence, timestamp, diversifier, path, data, &signature)
}

/// Check a raw signature over explicitly given sign-bytes fields.
pub fn verify_signature(
    public_key: &Secp256k1PublicKey,
    sequence: u64,
    timestamp: u64,
    diversifier: &str,
    path: &[u8],
    data: &[u8],
    signature: &[u8],
) -> SoloResult<()> {
    let signature = Secp256k1Signature::from_slice(signature).map_err(|e| SoloMachineError::Signing {
        message: e.to_string(),
    })?;
    let bytes = encode_sign_bytes(sequence, timestamp, diversifier, path, data);
    public_key
        .verify(&bytes, &signature)
        .map_err(|e| SoloMachineError::Signing {
            message: format!("proof at sequence {sequence}: {e}"),
        })
}
