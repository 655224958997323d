//! # Protocol Store Configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Durable backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Volatile; tests only.
    Memory,
    /// Single file rewritten atomically on every commit.
    #[default]
    File,
    /// RocksDB; requires the `rocksdb` feature.
    RocksDb,
}

/// Configuration for opening a [`crate::ProtocolStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to open.
    pub backend: StoreBackend,
    /// File or directory path; ignored for `memory`. Relative paths resolve
    /// against the solo-machine home directory.
    pub path: PathBuf,
    /// fsync every commit (RocksDB only; the file backend always syncs).
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            path: PathBuf::from("data/solo-machine.db"),
            sync_writes: true,
        }
    }
}

impl StoreConfig {
    /// Create config for testing (in-memory).
    pub fn for_testing() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: PathBuf::new(),
            sync_writes: false,
        }
    }

    /// File-backed store at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::File,
            path: path.into(),
            sync_writes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, StoreBackend::File);
        assert!(config.sync_writes);
        assert_eq!(StoreConfig::for_testing().backend, StoreBackend::Memory);
    }
}
