//! Domain layer for identity and chain links.

pub mod entities;
pub mod invariants;
pub mod value_objects;

pub use entities::{ChainLink, HandshakeStage};
pub use value_objects::{generate_diversifier, is_valid_diversifier, LinkField};
