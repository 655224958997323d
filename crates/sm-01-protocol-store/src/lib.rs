//! # Protocol Store (Subsystem 01)
//!
//! Durable, versioned, namespaced key-value state that makes the solo machine
//! crash-safe. Every other subsystem persists through this crate.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ ProtocolStore (service)                               │
//! │   Namespace ─ get / has / set / delete / prove        │
//! │   commit ─ buffered ops + version + root, one batch   │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ KeyValueStore (outbound port)
//!          ┌─────────────────┼──────────────────┐
//!   InMemoryKVStore   FileBackedKVStore   RocksDbStore (feature)
//! ```
//!
//! ## Guarantees
//!
//! - Reads observe committed state only.
//! - `commit` is atomic: all buffered writes, the version bump and the
//!   commitment root land together or not at all.
//! - Namespaces cannot observe each other's keys, whatever bytes the names
//!   and keys contain.
//! - Namespaces opened in Merkle mode feed a SHA-256 commitment root with
//!   per-entry inclusion proofs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FileBackedKVStore, InMemoryKVStore};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use algorithms::merkle::{verify_inclusion, InclusionProof};
pub use config::{StoreBackend, StoreConfig};
pub use domain::{CommitInfo, KVStoreError};
pub use ports::{BatchOperation, KeyValueStore};
pub use service::{Namespace, ProtocolStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
