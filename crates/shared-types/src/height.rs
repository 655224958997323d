//! # IBC Heights
//!
//! A height is a `(revision_number, revision_height)` pair ordered
//! lexicographically. It doubles as the `ibc.core.client.v1.Height` wire
//! message.

use crate::errors::SoloMachineError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Revision-aware block height.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, prost::Message)]
pub struct Height {
    /// Revision (incremented on chain upgrades that reset heights)
    #[prost(uint64, tag = "1")]
    pub revision_number: u64,
    /// Height within the revision
    #[prost(uint64, tag = "2")]
    pub revision_height: u64,
}

impl Height {
    /// Build a height.
    pub const fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    /// The zero height, used for "not frozen" and "no timeout".
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// True if both components are zero.
    pub fn is_zero(&self) -> bool {
        self.revision_number == 0 && self.revision_height == 0
    }

    /// Height `delta` blocks later in the same revision.
    pub fn add_blocks(&self, delta: u64) -> Self {
        Self::new(
            self.revision_number,
            self.revision_height.saturating_add(delta),
        )
    }

    /// Next height in the same revision.
    pub fn increment(&self) -> Self {
        self.add_blocks(1)
    }

    /// Revision number encoded in a chain id of the form `{name}-{revision}`.
    ///
    /// Chain ids without a numeric suffix are revision 0.
    pub fn revision_from_chain_id(chain_id: &str) -> u64 {
        chain_id
            .rsplit_once('-')
            .and_then(|(name, rev)| {
                if name.is_empty() {
                    None
                } else {
                    rev.parse::<u64>().ok()
                }
            })
            .unwrap_or(0)
    }
}

impl PartialOrd for Height {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Height {
    fn cmp(&self, other: &Self) -> Ordering {
        self.revision_number
            .cmp(&other.revision_number)
            .then(self.revision_height.cmp(&other.revision_height))
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

impl FromStr for Height {
    type Err = SoloMachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rev, height) = s
            .split_once('-')
            .ok_or_else(|| SoloMachineError::serialization(format!("invalid height {s:?}")))?;
        let revision_number = rev
            .parse()
            .map_err(|_| SoloMachineError::serialization(format!("invalid revision in {s:?}")))?;
        let revision_height = height
            .parse()
            .map_err(|_| SoloMachineError::serialization(format!("invalid height in {s:?}")))?;
        Ok(Self::new(revision_number, revision_height))
    }
}
