//! Sign-bytes encoding and proof verification.

pub mod sign_bytes;

pub use sign_bytes::{decode_proof, encode_sign_bytes, verify_proof, verify_signature};
