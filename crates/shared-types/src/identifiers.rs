//! # Identifiers
//!
//! ICS-24 identifier formats for the resources a solo machine allocates
//! locally, plus validation for identifiers returned by a counterparty.

use crate::errors::SoloMachineError;

/// Port bound by the fungible-token transfer application.
pub const TRANSFER_PORT: &str = "transfer";

/// ICS-20 application version.
pub const ICS20_VERSION: &str = "ics20-1";

/// Resource types allocated from per-chain-link counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    /// `07-tendermint-<n>`
    TendermintClient,
    /// `connection-<n>`
    Connection,
    /// `channel-<n>`
    Channel,
}

impl IdentifierKind {
    /// Identifier prefix, without the trailing separator.
    pub fn prefix(&self) -> &'static str {
        match self {
            IdentifierKind::TendermintClient => "07-tendermint",
            IdentifierKind::Connection => "connection",
            IdentifierKind::Channel => "channel",
        }
    }

    /// Render the identifier for counter value `n`.
    pub fn format(&self, n: u64) -> String {
        format!("{}-{}", self.prefix(), n)
    }

    /// Counter value of an identifier of this kind, if it is one.
    pub fn parse(&self, id: &str) -> Option<u64> {
        id.strip_prefix(self.prefix())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }
}

/// Validate an identifier against the ICS-24 host requirements.
pub fn validate_identifier(id: &str) -> Result<(), SoloMachineError> {
    if id.len() < 2 || id.len() > 64 {
        return Err(SoloMachineError::serialization(format!(
            "identifier {id:?} must be 2..=64 characters"
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "._+-#[]<>".contains(c);
    if !id.chars().all(allowed) {
        return Err(SoloMachineError::serialization(format!(
            "identifier {id:?} contains invalid characters"
        )));
    }
    Ok(())
}
