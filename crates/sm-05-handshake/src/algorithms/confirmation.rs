//! # Confirmation Polling
//!
//! A submitted transaction is confirmed by polling until the chain reports
//! its result. Transport failures are retried; a rejected transaction ends
//! the wait immediately; exhaustion, the deadline or cancellation end it in
//! `Timeout`.

use serde::{Deserialize, Serialize};
use shared_types::{SoloMachineError, SoloResult};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

/// Default pause between polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
/// Default number of polls before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 25;

/// How long to keep polling for a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Pause between polls in milliseconds.
    pub interval_ms: u64,
    /// Polls before giving up.
    pub max_attempts: u32,
    /// Overall wall-clock limit in seconds, if any.
    pub deadline_secs: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            deadline_secs: None,
        }
    }
}

impl RetryPolicy {
    /// Short policy for tests.
    pub fn for_testing() -> Self {
        Self {
            interval_ms: 10,
            max_attempts: 5,
            deadline_secs: None,
        }
    }

    /// Pause between polls.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Reject a policy that can never poll.
    pub fn validate(&self) -> SoloResult<()> {
        if self.max_attempts == 0 {
            return Err(SoloMachineError::Configuration {
                message: "confirmation.max_attempts must be at least 1".to_string(),
            });
        }
        if self.deadline_secs == Some(0) {
            return Err(SoloMachineError::Configuration {
                message: "confirmation.deadline_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Poll until `poll` yields a value.
///
/// `poll` receives the 1-based attempt number and returns `Ok(None)` while
/// the result is not yet available. Setting `cancel` to `true` stops the
/// wait at the next pause.
pub async fn wait_for_confirmation<T, F, Fut>(
    what: &str,
    policy: &RetryPolicy,
    mut cancel: Option<watch::Receiver<bool>>,
    mut poll: F,
) -> SoloResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = SoloResult<Option<T>>>,
{
    let deadline = policy
        .deadline_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let timeout = |attempts| SoloMachineError::Timeout {
        what: what.to_string(),
        attempts,
    };

    let mut attempts = 0;
    while attempts < policy.max_attempts {
        if is_cancelled(&cancel) {
            return Err(timeout(attempts));
        }
        attempts += 1;
        match poll(attempts).await {
            Ok(Some(value)) => {
                debug!(what, attempts, "confirmed");
                return Ok(value);
            }
            Ok(None) => debug!(what, attempts, "not yet confirmed"),
            Err(e) if e.is_retryable() => warn!(what, attempts, error = %e, "poll failed, retrying"),
            Err(e) => return Err(e),
        }
        if attempts == policy.max_attempts {
            break;
        }
        let wake = Instant::now() + policy.interval();
        tokio::select! {
            _ = sleep_until(wake) => {}
            _ = cancelled(&mut cancel) => return Err(timeout(attempts)),
            _ = expired(deadline) => return Err(timeout(attempts)),
        }
    }
    Err(timeout(attempts))
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().is_some_and(|rx| *rx.borrow())
}

async fn cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = cancel else {
        return std::future::pending().await;
    };
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // sender gone: nobody can cancel any more
            return std::future::pending().await;
        }
    }
}

async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
