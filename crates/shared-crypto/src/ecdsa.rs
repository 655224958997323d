//! # Machine Identity Key (secp256k1)
//!
//! The solo machine signs every proof and header with a single secp256k1
//! key. Signatures are the 64-byte `r || s` form Cosmos chains verify:
//! SHA-256 prehash, RFC 6979 nonces, low-S normalized.

use crate::CryptoError;
use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use std::fmt;
use zeroize::Zeroizing;

/// Compressed SEC1 public key length.
pub const PUBLIC_KEY_LEN: usize = 33;

/// Secret scalar length.
pub const SECRET_KEY_LEN: usize = 32;

/// Compact signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Secp256k1PublicKey([u8; PUBLIC_KEY_LEN]);

impl Secp256k1PublicKey {
    /// Parse compressed bytes, rejecting points not on the curve.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; PUBLIC_KEY_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_LEN,
                actual: bytes.len(),
            })?;
        VerifyingKey::from_sec1_bytes(&arr).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self(arr))
    }

    /// Raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Verify a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Secp256k1Signature) -> Result<(), CryptoError> {
        let verifying_key = VerifyingKey::from_sec1_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        let sig = Signature::from_slice(&signature.0)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl fmt::Debug for Secp256k1PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1PublicKey(")?;
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

/// ECDSA signature in compact `r || s` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature([u8; SIGNATURE_LEN]);

impl Secp256k1Signature {
    /// Parse a 64-byte compact signature.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignature(format!("expected {SIGNATURE_LEN} bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Owned raw bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// The machine's signing keypair. The secret is zeroized when dropped.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Restore from a persisted 32-byte secret.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SECRET_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: SECRET_KEY_LEN,
                actual: bytes.len(),
            });
        }
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Compressed public key.
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes.copy_from_slice(point.as_bytes());
        Secp256k1PublicKey(bytes)
    }

    /// Sign `message` (SHA-256 prehash, deterministic nonce).
    pub fn sign(&self, message: &[u8]) -> Secp256k1Signature {
        let sig: Signature = self.signing_key.sign(message);
        let sig = sig.normalize_s().unwrap_or(sig);
        Secp256k1Signature(sig.to_bytes().into())
    }

    /// Secret bytes for persistence, wiped when the returned buffer drops.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.signing_key.to_bytes().to_vec())
    }
}

impl fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Secp256k1KeyPair::generate();
        let signature = keypair.sign(b"sign bytes");
        assert!(keypair.public_key().verify(b"sign bytes", &signature).is_ok());
        assert!(keypair.public_key().verify(b"sign bytez", &signature).is_err());
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_slice(&[0xABu8; 32]).unwrap();
        assert_eq!(keypair.sign(b"m"), keypair.sign(b"m"));
    }

    #[test]
    fn test_secret_roundtrip_preserves_identity() {
        let original = Secp256k1KeyPair::generate();
        let restored = Secp256k1KeyPair::from_slice(&original.secret_bytes()).unwrap();
        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn test_public_key_is_compressed() {
        let pk = Secp256k1KeyPair::generate().public_key();
        assert!(pk.as_bytes()[0] == 0x02 || pk.as_bytes()[0] == 0x03);
        assert_eq!(Secp256k1PublicKey::from_slice(pk.as_bytes()).unwrap(), pk);
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(matches!(
            Secp256k1KeyPair::from_slice(&[1u8; 31]),
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 31 })
        ));
        assert!(Secp256k1PublicKey::from_slice(&[2u8; 32]).is_err());
        assert!(Secp256k1Signature::from_slice(&[0u8; 63]).is_err());
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let keypair = Secp256k1KeyPair::from_slice(&[0x11u8; 32]).unwrap();
        let rendered = format!("{keypair:?}");
        assert!(!rendered.contains(&hex::encode([0x11u8; 32])));
    }
}
