//! # Error Taxonomy
//!
//! A single error type crosses every crate boundary. Components attach the
//! chain-link name and the handshake step they were executing, so a failed
//! run tells the operator exactly where re-running will resume.

use std::fmt;
use thiserror::Error;

/// Why a storage operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// The requested key or record does not exist.
    NotFound,
    /// The backend could not read or write.
    Io,
    /// Stored bytes could not be decoded.
    Corrupted,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageErrorKind::NotFound => write!(f, "not found"),
            StorageErrorKind::Io => write!(f, "io"),
            StorageErrorKind::Corrupted => write!(f, "corrupted"),
        }
    }
}

/// Coarse classification used by callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing configuration.
    Configuration,
    /// Transport failure talking to a chain.
    Network,
    /// The counterparty or local records are not in the expected state.
    ProtocolState,
    /// Encoding or decoding failed.
    Serialization,
    /// Key material or signature failure.
    Signing,
    /// Protocol store failure.
    Storage,
    /// The chain rejected a transaction.
    TransactionFailed,
    /// Confirmation was not observed in time.
    Timeout,
    /// An expected event attribute was missing from a transaction result.
    AttributeNotFound,
}

/// Errors produced by the solo-machine engine.
#[derive(Debug, Error)]
pub enum SoloMachineError {
    /// Invalid or missing configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// Transport failure talking to a chain.
    #[error("network error on {chain}: {message}")]
    Network {
        /// Chain-link name
        chain: String,
        /// Underlying failure
        message: String,
    },

    /// Local or remote handshake state does not allow the requested step.
    #[error("protocol state error on {chain} during {step}: {reason}")]
    ProtocolState {
        /// Chain-link name
        chain: String,
        /// Handshake step being executed
        step: String,
        /// Why the step cannot proceed
        reason: String,
    },

    /// Encoding or decoding failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Underlying failure
        message: String,
    },

    /// Key material or signature failure.
    #[error("signing error: {message}")]
    Signing {
        /// Underlying failure
        message: String,
    },

    /// Protocol store failure.
    #[error("storage error ({kind}): {message}")]
    Storage {
        /// Failure class
        kind: StorageErrorKind,
        /// Key or context
        message: String,
    },

    /// The chain accepted the broadcast but execution failed.
    #[error("transaction {tx_hash} failed on {chain}: {raw_log}")]
    TransactionFailed {
        /// Chain-link name
        chain: String,
        /// Transaction hash
        tx_hash: String,
        /// Raw execution log returned by the chain
        raw_log: String,
    },

    /// Confirmation polling gave up.
    #[error("timed out waiting for {what} after {attempts} attempts")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// A transaction result lacked an expected event attribute.
    #[error("attribute {attribute} not found in {event} event")]
    AttributeNotFound {
        /// Event type searched
        event: String,
        /// Attribute key searched
        attribute: String,
    },
}

impl SoloMachineError {
    /// Shorthand for [`SoloMachineError::ProtocolState`].
    pub fn protocol_state(
        chain: impl Into<String>,
        step: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SoloMachineError::ProtocolState {
            chain: chain.into(),
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a `NotFound` storage error.
    pub fn not_found(what: impl Into<String>) -> Self {
        SoloMachineError::Storage {
            kind: StorageErrorKind::NotFound,
            message: what.into(),
        }
    }

    /// Shorthand for an `Io` storage error.
    pub fn storage_io(message: impl Into<String>) -> Self {
        SoloMachineError::Storage {
            kind: StorageErrorKind::Io,
            message: message.into(),
        }
    }

    /// Shorthand for a `Corrupted` storage error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        SoloMachineError::Storage {
            kind: StorageErrorKind::Corrupted,
            message: message.into(),
        }
    }

    /// Shorthand for [`SoloMachineError::Serialization`].
    pub fn serialization(message: impl fmt::Display) -> Self {
        SoloMachineError::Serialization {
            message: message.to_string(),
        }
    }

    /// Shorthand for [`SoloMachineError::Network`].
    pub fn network(chain: impl Into<String>, message: impl fmt::Display) -> Self {
        SoloMachineError::Network {
            chain: chain.into(),
            message: message.to_string(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SoloMachineError::Configuration { .. } => ErrorKind::Configuration,
            SoloMachineError::Network { .. } => ErrorKind::Network,
            SoloMachineError::ProtocolState { .. } => ErrorKind::ProtocolState,
            SoloMachineError::Serialization { .. } => ErrorKind::Serialization,
            SoloMachineError::Signing { .. } => ErrorKind::Signing,
            SoloMachineError::Storage { .. } => ErrorKind::Storage,
            SoloMachineError::TransactionFailed { .. } => ErrorKind::TransactionFailed,
            SoloMachineError::Timeout { .. } => ErrorKind::Timeout,
            SoloMachineError::AttributeNotFound { .. } => ErrorKind::AttributeNotFound,
        }
    }

    /// Only transport failures are worth another attempt while polling.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SoloMachineError::Network { .. })
    }

    /// True for a `NotFound` storage error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SoloMachineError::Storage {
                kind: StorageErrorKind::NotFound,
                ..
            }
        )
    }
}

impl From<prost::EncodeError> for SoloMachineError {
    fn from(e: prost::EncodeError) -> Self {
        SoloMachineError::serialization(e)
    }
}

impl From<prost::DecodeError> for SoloMachineError {
    fn from(e: prost::DecodeError) -> Self {
        SoloMachineError::serialization(e)
    }
}

impl From<serde_json::Error> for SoloMachineError {
    fn from(e: serde_json::Error) -> Self {
        SoloMachineError::serialization(e)
    }
}

/// Result alias used throughout the workspace.
pub type SoloResult<T> = Result<T, SoloMachineError>;
