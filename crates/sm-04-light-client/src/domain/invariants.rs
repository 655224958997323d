//! # Domain Invariants
//!
//! Rules the tracker enforces before delegating to the verifier.

use shared_types::proto::tendermint::ConsensusState;
use shared_types::Height;

/// Invariant: headers are applied at non-decreasing heights.
pub fn invariant_non_decreasing(latest: Height, header: Height) -> Result<(), String> {
    if header < latest {
        return Err(format!("header height {header} is below latest height {latest}"));
    }
    Ok(())
}

/// Invariant: a known height is never overwritten with different content.
pub fn invariant_consistent_at_height(
    height: Height,
    stored: &ConsensusState,
    incoming: &ConsensusState,
) -> Result<(), String> {
    if stored == incoming {
        Ok(())
    } else {
        Err(format!("conflicting consensus state at known height {height}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::proto::ibc::MerkleRoot;

    #[test]
    fn test_non_decreasing() {
        assert!(invariant_non_decreasing(Height::new(1, 10), Height::new(1, 10)).is_ok());
        assert!(invariant_non_decreasing(Height::new(1, 10), Height::new(2, 1)).is_ok());
        assert!(invariant_non_decreasing(Height::new(1, 10), Height::new(1, 9)).is_err());
    }

    #[test]
    fn test_consistent_at_height() {
        let a = ConsensusState {
            root: Some(MerkleRoot { hash: vec![1] }),
            ..Default::default()
        };
        let b = ConsensusState {
            root: Some(MerkleRoot { hash: vec![2] }),
            ..Default::default()
        };
        assert_eq!(invariant_consistent_at_height(Height::new(1, 1), &a, &a), Ok(()));
        assert!(invariant_consistent_at_height(Height::new(1, 1), &a, &b).is_err());
    }
}
