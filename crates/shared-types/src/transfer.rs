//! ICS-20 fungible token packet payload.

use crate::errors::SoloMachineError;
use serde::{Deserialize, Serialize};

/// Packet data of the transfer application.
///
/// Fields are declared in alphabetical order so the JSON encoding has the
/// sorted keys the counterparty hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleTokenPacketData {
    /// Amount as a decimal string
    pub amount: String,
    /// Denomination, possibly with a trace prefix
    pub denom: String,
    /// Optional memo
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    /// Recipient address on the counterparty
    pub receiver: String,
    /// Sender address on the solo machine
    pub sender: String,
}

impl FungibleTokenPacketData {
    /// Validated constructor.
    pub fn new(
        denom: impl Into<String>,
        amount: u128,
        sender: impl Into<String>,
        receiver: impl Into<String>,
    ) -> Result<Self, SoloMachineError> {
        let data = Self {
            amount: amount.to_string(),
            denom: denom.into(),
            memo: String::new(),
            receiver: receiver.into(),
            sender: sender.into(),
        };
        data.validate()?;
        Ok(data)
    }

    /// Reject empty fields and a zero amount.
    pub fn validate(&self) -> Result<(), SoloMachineError> {
        let invalid = |what: &str| SoloMachineError::Configuration {
            message: format!("invalid transfer: {what}"),
        };
        if self.denom.trim().is_empty() {
            return Err(invalid("empty denom"));
        }
        if self.sender.trim().is_empty() {
            return Err(invalid("empty sender"));
        }
        if self.receiver.trim().is_empty() {
            return Err(invalid("empty receiver"));
        }
        match self.amount.parse::<u128>() {
            Ok(0) | Err(_) => Err(invalid("amount must be a positive integer")),
            Ok(_) => Ok(()),
        }
    }

    /// JSON bytes placed in the packet.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SoloMachineError> {
        Ok(serde_json::to_vec(self)?)
    }
}
