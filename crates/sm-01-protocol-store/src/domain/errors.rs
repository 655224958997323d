//! # Domain Errors
//!
//! Backend errors. They convert into [`SoloMachineError::Storage`] at the
//! store boundary.

use shared_types::{SoloMachineError, StorageErrorKind};
use thiserror::Error;

/// Key-value backend errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KVStoreError {
    /// Read or write failed.
    #[error("I/O error: {message}")]
    IOError {
        /// Error details
        message: String,
    },

    /// Persisted bytes could not be decoded.
    #[error("Corrupted store data: {message}")]
    Corrupted {
        /// Error details
        message: String,
    },
}

impl From<KVStoreError> for SoloMachineError {
    fn from(e: KVStoreError) -> Self {
        let kind = match e {
            KVStoreError::IOError { .. } => StorageErrorKind::Io,
            KVStoreError::Corrupted { .. } => StorageErrorKind::Corrupted,
        };
        SoloMachineError::Storage {
            kind,
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for KVStoreError {
    fn from(e: std::io::Error) -> Self {
        KVStoreError::IOError {
            message: e.to_string(),
        }
    }
}
