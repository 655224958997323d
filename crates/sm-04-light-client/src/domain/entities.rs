//! # Domain Entities

use serde::Serialize;
use shared_types::Height;

/// Lifecycle of a mirrored light client. `Absent -> Initialized` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackerStatus {
    /// Nothing persisted yet.
    Absent,
    /// Client and at least one consensus state persisted.
    Initialized {
        /// Highest consensus height held
        latest_height: Height,
    },
}

impl TrackerStatus {
    /// Latest height, if initialized.
    pub fn latest_height(&self) -> Option<Height> {
        match self {
            TrackerStatus::Absent => None,
            TrackerStatus::Initialized { latest_height } => Some(*latest_height),
        }
    }
}

/// Result of applying a counterparty header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOutcome {
    /// The height was already known with identical content.
    Unchanged(Height),
    /// A new consensus state was staged.
    Applied {
        /// Height of the new consensus state
        height: Height,
        /// Latest height after the update
        latest_height: Height,
    },
}
