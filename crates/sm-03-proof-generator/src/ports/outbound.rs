//! # Outbound Ports
//!
//! Dependencies the proof generator needs from the outside world.

use std::sync::atomic::{AtomicU64, Ordering};

/// Abstract interface for wall-clock time (for testability).
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the unix epoch.
    fn now_millis(&self) -> u64;
}

/// Default time source using system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually driven time source for unit tests.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    millis: AtomicU64,
}

impl MockTimeSource {
    /// Clock frozen at `millis`.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}
