//! # Shared Types Crate
//!
//! Everything that crosses a crate boundary in the solo-machine workspace.
//!
//! ## Contents
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `errors` | `SoloMachineError` taxonomy |
//! | `height` | Revision-aware heights |
//! | `identifiers` | ICS-24 identifier formats |
//! | `paths` | Commitment paths and packet commitments |
//! | `proto` | Protobuf wire messages |
//! | `header` | Counterparty headers |
//! | `transfer` | ICS-20 packet data |
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: wire messages are defined once, with upstream
//!   field tags, and used directly as domain values.
//! - **Deterministic Encoding**: everything a solo machine signs is protobuf
//!   encoded with fields in tag order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod header;
pub mod height;
pub mod identifiers;
pub mod paths;
#[allow(missing_docs)]
pub mod proto;
pub mod transfer;

pub use errors::{ErrorKind, SoloMachineError, SoloResult, StorageErrorKind};
pub use header::CounterpartyHeader;
pub use height::Height;
pub use identifiers::{IdentifierKind, ICS20_VERSION, TRANSFER_PORT};
pub use transfer::FungibleTokenPacketData;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
