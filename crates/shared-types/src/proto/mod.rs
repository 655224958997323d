//! # Wire Messages
//!
//! Protobuf messages exchanged with the counterparty chain and signed over by
//! the solo machine. Field tags match the upstream `.proto` definitions so the
//! encoded bytes are accepted as-is by an IBC-enabled chain.

pub mod cosmos;
pub mod google;
pub mod ibc;
pub mod ics23;
pub mod solomachine;
pub mod tendermint;

use crate::errors::SoloMachineError;
use google::Any;
use prost::Message;

/// A message that can be packed into [`Any`].
pub trait TypeUrl {
    /// Fully-qualified type URL, including the leading `/`.
    const TYPE_URL: &'static str;
}

/// Pack a message into [`Any`].
pub fn to_any<M: Message + TypeUrl>(msg: &M) -> Any {
    Any {
        type_url: M::TYPE_URL.to_string(),
        value: msg.encode_to_vec(),
    }
}

/// Unpack a message from [`Any`], checking the type URL.
pub fn from_any<M: Message + TypeUrl + Default>(any: &Any) -> Result<M, SoloMachineError> {
    if any.type_url != M::TYPE_URL {
        return Err(SoloMachineError::serialization(format!(
            "expected {}, got {}",
            M::TYPE_URL,
            any.type_url
        )));
    }
    Ok(M::decode(any.value.as_slice())?)
}
