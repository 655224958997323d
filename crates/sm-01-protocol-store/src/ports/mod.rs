//! Ports for the Protocol Store.

pub mod outbound;

pub use outbound::{BatchOperation, KeyValueStore, ScanResult};
