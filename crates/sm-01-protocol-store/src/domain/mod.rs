//! Domain layer for the Protocol Store.

pub mod entities;
pub mod errors;
pub mod keys;

pub use entities::CommitInfo;
pub use errors::KVStoreError;
pub use keys::NamespacePath;
