//! Cosmos SDK crypto and signing messages.

use super::TypeUrl;

/// `cosmos.crypto.secp256k1.PubKey`: 33-byte compressed point.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

impl TypeUrl for PubKey {
    const TYPE_URL: &'static str = "/cosmos.crypto.secp256k1.PubKey";
}

/// `cosmos.tx.signing.v1beta1.SignMode`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SignMode {
    Unspecified = 0,
    Direct = 1,
    Textual = 2,
    LegacyAminoJson = 127,
}

/// `SignatureDescriptor.Data.Single`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SingleSignatureData {
    #[prost(enumeration = "SignMode", tag = "1")]
    pub mode: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// `SignatureDescriptor.Data`, restricted to the single-signer case.
///
/// Wire-compatible with the upstream `oneof sum { Single single = 1; Multi multi = 2; }`.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SignatureData {
    #[prost(message, optional, tag = "1")]
    pub single: Option<SingleSignatureData>,
}

impl SignatureData {
    /// Wrap a raw 64-byte signature in direct sign mode.
    pub fn direct(signature: Vec<u8>) -> Self {
        Self {
            single: Some(SingleSignatureData {
                mode: SignMode::Direct as i32,
                signature,
            }),
        }
    }

    /// Raw signature bytes, if this is a single-signer descriptor.
    pub fn signature(&self) -> Option<&[u8]> {
        self.single.as_ref().map(|s| s.signature.as_slice())
    }
}
