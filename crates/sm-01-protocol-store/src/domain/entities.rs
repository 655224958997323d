//! Commit records.

use serde::{Deserialize, Serialize};
use shared_crypto::Hash;

/// Persisted alongside every commit, in the same atomic batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Monotonic store version; the first commit is version 1.
    pub version: u64,
    /// Merkle root over all committed Merkle-area entries.
    pub root: Hash,
    /// Number of Merkle-area entries covered by `root`.
    pub merkle_entries: u64,
}

impl CommitInfo {
    /// State of a store that has never committed.
    pub fn genesis() -> Self {
        Self {
            version: 0,
            root: [0u8; 32],
            merkle_entries: 0,
        }
    }
}
