//! Pure helpers of the orchestrator.

pub mod confirmation;

pub use confirmation::{wait_for_confirmation, RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS};
