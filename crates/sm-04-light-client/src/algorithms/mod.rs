//! Construction of the mirrored client state.

pub mod client_state;

pub use client_state::{build_client_state, trusting_period, UPGRADE_PATH};
