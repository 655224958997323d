//! Failures of the machine's secp256k1 key operations.

use thiserror::Error;

/// Key parsing and signature failures.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encoded key has the wrong size
    #[error("secp256k1 key must be {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Bytes do not encode a point on the curve
    #[error("not a secp256k1 public key: {0}")]
    InvalidPublicKey(String),

    /// Persisted secret is zero or out of range
    #[error("not a secp256k1 secret key: {0}")]
    InvalidPrivateKey(String),

    /// Signature is not 64 compact bytes or not a valid scalar pair
    #[error("malformed signature: {0}")]
    InvalidSignature(String),

    /// Well-formed signature that does not match key and message
    #[error("signature does not match")]
    SignatureVerificationFailed,
}
