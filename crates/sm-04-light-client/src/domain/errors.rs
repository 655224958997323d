//! # Domain Errors
//!
//! Failures reported by a light-client verifier.

use shared_types::{Height, SoloMachineError};
use thiserror::Error;

/// Light-client verification error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The verifier holds no state for this client.
    #[error("client {client_id} is not initialized")]
    NotInitialized {
        /// Client identifier
        client_id: String,
    },

    /// The verifier already holds state for this client.
    #[error("client {client_id} is already initialized")]
    AlreadyInitialized {
        /// Client identifier
        client_id: String,
    },

    /// Header produced by a different chain.
    #[error("header from chain {actual}, client tracks {expected}")]
    ChainIdMismatch {
        /// Chain id of the client
        expected: String,
        /// Chain id of the header
        actual: String,
    },

    /// No consensus state at the header's trusted height.
    #[error("no trusted consensus state at height {height}")]
    UnknownTrustedHeight {
        /// Trusted height named by the header
        height: Height,
    },

    /// Header is not above its trusted height.
    #[error("header height {header} is not above trusted height {trusted}")]
    NonIncreasingHeight {
        /// Trusted height
        trusted: Height,
        /// Header height
        header: Height,
    },

    /// Trusted consensus state expired before the header's block time.
    #[error("trusted state at {trusted} expired: header time {header_time_nanos}ns exceeds trusting period")]
    TrustingPeriodExpired {
        /// Trusted height
        trusted: Height,
        /// Header block time, unix nanoseconds
        header_time_nanos: u64,
    },

    /// Header block time does not advance past the trusted state.
    #[error("header time {header_time_nanos}ns is not after trusted time {trusted_time_nanos}ns")]
    NonIncreasingTime {
        /// Trusted block time, unix nanoseconds
        trusted_time_nanos: u64,
        /// Header block time, unix nanoseconds
        header_time_nanos: u64,
    },

    /// Client or consensus state bytes could not be decoded.
    #[error("malformed state: {0}")]
    Malformed(String),
}

impl VerificationError {
    /// Lift into the engine taxonomy with the owning client and step.
    pub fn into_solo(self, client_id: &str, step: &str) -> SoloMachineError {
        match self {
            VerificationError::Malformed(message) => SoloMachineError::Serialization { message },
            other => SoloMachineError::protocol_state(client_id, step, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ErrorKind;

    #[test]
    fn test_into_solo_kinds() {
        let e = VerificationError::Malformed("bad".into()).into_solo("07-tendermint-0", "initialize");
        assert_eq!(e.kind(), ErrorKind::Serialization);
        let e = VerificationError::UnknownTrustedHeight {
            height: Height::new(1, 3),
        }
        .into_solo("07-tendermint-0", "update");
        assert_eq!(e.kind(), ErrorKind::ProtocolState);
        assert!(e.to_string().contains("1-3"));
    }
}
