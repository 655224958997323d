//! Domain layer of the orchestrator.

pub mod entities;
pub mod messages;

pub use entities::{LinkStatus, RefreshOutcome, TransferReceipt, TransferRequest};
pub use messages::{ChannelOpenAck, ConnectionOpenAck};
