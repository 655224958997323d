//! # Light Client Configuration

use serde::{Deserialize, Serialize};

/// Parameters of the mirrored Tendermint client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightClientConfig {
    /// Trusting period as a percentage of the counterparty's unbonding period.
    pub trusting_period_percent: u32,

    /// Maximum tolerated clock drift in seconds.
    pub max_clock_drift_secs: u64,

    /// Trust level numerator.
    pub trust_level_numerator: u64,

    /// Trust level denominator.
    pub trust_level_denominator: u64,
}

impl Default for LightClientConfig {
    fn default() -> Self {
        Self {
            trusting_period_percent: 85,
            max_clock_drift_secs: 600,
            trust_level_numerator: 1,
            trust_level_denominator: 3,
        }
    }
}

impl LightClientConfig {
    /// Create a config for testing (small clock drift).
    pub fn for_testing() -> Self {
        Self {
            max_clock_drift_secs: 5,
            ..Self::default()
        }
    }

    /// Reject parameters no counterparty would accept.
    pub fn validate(&self) -> Result<(), String> {
        if self.trusting_period_percent == 0 || self.trusting_period_percent >= 100 {
            return Err(format!(
                "trusting_period_percent must be in 1..100, got {}",
                self.trusting_period_percent
            ));
        }
        if self.trust_level_denominator == 0
            || self.trust_level_numerator == 0
            || self.trust_level_numerator > self.trust_level_denominator
        {
            return Err(format!(
                "trust level {}/{} is not a fraction in (0, 1]",
                self.trust_level_numerator, self.trust_level_denominator
            ));
        }
        Ok(())
    }
}
