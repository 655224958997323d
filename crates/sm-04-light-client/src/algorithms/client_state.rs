//! # Client State Construction
//!
//! Builds the Tendermint client state the solo machine mirrors, from the
//! counterparty's latest header height and unbonding period.

use crate::config::LightClientConfig;
use shared_types::proto::google::Duration;
use shared_types::proto::ics23::sdk_specs;
use shared_types::proto::tendermint::{ClientState, Fraction};
use shared_types::Height;
use std::time::Duration as StdDuration;

/// Upgrade path of an SDK chain's upgrade module.
pub const UPGRADE_PATH: [&str; 2] = ["upgrade", "upgradedIBCState"];

/// `unbonding * percent / 100`, at nanosecond precision.
pub fn trusting_period(unbonding: StdDuration, percent: u32) -> StdDuration {
    let nanos = unbonding.as_nanos() * u128::from(percent) / 100;
    StdDuration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Mirrored client state at `latest_height`.
pub fn build_client_state(
    chain_id: &str,
    latest_height: Height,
    unbonding: StdDuration,
    config: &LightClientConfig,
) -> ClientState {
    ClientState {
        chain_id: chain_id.to_string(),
        trust_level: Some(Fraction {
            numerator: config.trust_level_numerator,
            denominator: config.trust_level_denominator,
        }),
        trusting_period: Some(Duration::from_std(trusting_period(
            unbonding,
            config.trusting_period_percent,
        ))),
        unbonding_period: Some(Duration::from_std(unbonding)),
        max_clock_drift: Some(Duration::from_std(StdDuration::from_secs(
            config.max_clock_drift_secs,
        ))),
        frozen_height: Some(Height::zero()),
        latest_height: Some(latest_height),
        proof_specs: sdk_specs(),
        upgrade_path: UPGRADE_PATH.iter().map(|s| s.to_string()).collect(),
        allow_update_after_expiry: false,
        allow_update_after_misbehaviour: false,
    }
}
