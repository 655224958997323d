//! # Commitment Paths
//!
//! ICS-24 host paths a solo machine signs over, and the packet commitment
//! value stored at a packet path.

use crate::height::Height;
use sha2::{Digest, Sha256};

/// `connections/{connection_id}`
pub fn connection_path(connection_id: &str) -> String {
    format!("connections/{connection_id}")
}

/// `clients/{client_id}/clientState`
pub fn client_state_path(client_id: &str) -> String {
    format!("clients/{client_id}/clientState")
}

/// `clients/{client_id}/consensusStates/{revision}-{height}`
pub fn consensus_state_path(client_id: &str, height: Height) -> String {
    format!("clients/{client_id}/consensusStates/{height}")
}

/// `channelEnds/ports/{port_id}/channels/{channel_id}`
pub fn channel_path(port_id: &str, channel_id: &str) -> String {
    format!("channelEnds/ports/{port_id}/channels/{channel_id}")
}

/// `commitments/ports/{port_id}/channels/{channel_id}/sequences/{sequence}`
pub fn packet_commitment_path(port_id: &str, channel_id: &str, sequence: u64) -> String {
    format!("commitments/ports/{port_id}/channels/{channel_id}/sequences/{sequence}")
}

/// `sha256(timeout_timestamp || revision_number || revision_height || sha256(data))`,
/// integers big-endian.
pub fn packet_commitment(timeout_timestamp: u64, timeout_height: Height, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(56);
    buf.extend_from_slice(&timeout_timestamp.to_be_bytes());
    buf.extend_from_slice(&timeout_height.revision_number.to_be_bytes());
    buf.extend_from_slice(&timeout_height.revision_height.to_be_bytes());
    buf.extend_from_slice(&Sha256::digest(data));
    Sha256::digest(&buf).to_vec()
}
