//! # Commitment Tree
//!
//! Binary SHA-256 Merkle tree over the sorted Merkle-area entries.
//!
//! Leaves and inner nodes are domain-separated (`0x00` / `0x01` prefixes) so a
//! leaf can never be passed off as an inner node. On an odd level the last
//! node is promoted unchanged rather than duplicated, so no two distinct entry
//! sets share a root.

use serde::{Deserialize, Serialize};
use shared_crypto::{sha256, sha256_concat, Hash};

const LEAF_PREFIX: &[u8] = &[0x00];
const INNER_PREFIX: &[u8] = &[0x01];

/// Which side the sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    /// Sibling is the left child.
    Left,
    /// Sibling is the right child.
    Right,
}

/// One step of an inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    /// Sibling hash.
    pub hash: Hash,
    /// Sibling position.
    pub position: Position,
}

/// Inclusion proof of one entry under a commitment root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Full backend key of the entry.
    pub key: Vec<u8>,
    /// Sibling path from leaf to root.
    pub path: Vec<ProofNode>,
}

/// Hash of one entry.
pub fn leaf_hash(key: &[u8], value: &[u8]) -> Hash {
    let key_len = (key.len() as u32).to_be_bytes();
    sha256_concat(&[LEAF_PREFIX, &key_len, key, &sha256(value)])
}

fn inner_hash(left: &Hash, right: &Hash) -> Hash {
    sha256_concat(&[INNER_PREFIX, left, right])
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| match pair.get(1) {
            Some(right) => inner_hash(&pair[0], right),
            None => pair[0],
        })
        .collect()
}

/// Root over `leaves`; the empty tree has the all-zero root.
pub fn compute_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Sibling path for the leaf at `index`, or `None` if out of range.
pub fn build_path(leaves: &[Hash], index: usize) -> Option<Vec<ProofNode>> {
    if index >= leaves.len() {
        return None;
    }
    let mut path = Vec::new();
    let mut level = leaves.to_vec();
    let mut index = index;
    while level.len() > 1 {
        let sibling = index ^ 1;
        if sibling < level.len() {
            let position = if index % 2 == 0 {
                Position::Right
            } else {
                Position::Left
            };
            path.push(ProofNode {
                hash: level[sibling],
                position,
            });
        }
        level = next_level(&level);
        index /= 2;
    }
    Some(path)
}

/// Check that `key => value` is committed under `root`.
pub fn verify_inclusion(root: &Hash, proof: &InclusionProof, value: &[u8]) -> bool {
    let mut current = leaf_hash(&proof.key, value);
    for node in &proof.path {
        current = match node.position {
            Position::Left => inner_hash(&node.hash, &current),
            Position::Right => inner_hash(&current, &node.hash),
        };
    }
    current == *root
}
