//! The business parameters applied to the application after deployment

use std::{fs, path::Path};

use alloy_primitives::U256;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        INSERT_TIER_FUNCTION, SET_AUM_CAP_FUNCTION, SET_DURATIONS_FUNCTION,
        SET_REFERRAL_RATES_FUNCTION,
    },
    errors::DeployError,
    steps::{configure::ConfigCall, CallArg},
};

/// A membership tier: a deposit band and the bonus it earns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRule {
    /// The tier's display name
    pub label: String,
    /// The lowest deposit in the band
    pub min_threshold: U256,
    /// The highest deposit in the band
    pub max_threshold: U256,
    /// The bonus rate, in basis points
    pub bonus_rate_bps: u16,
    /// The first lock duration index the tier applies to
    pub lock_index_from: u8,
    /// The last lock duration index the tier applies to
    pub lock_index_to: u8,
}

/// The full setup parameter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupParams {
    /// Lock durations, in seconds
    pub durations: Vec<u64>,
    /// The bonus rate of each lock duration, in basis points
    pub bonus_rates: Vec<u16>,
    /// The membership tiers, inserted in order
    pub tiers: Vec<TierRule>,
    /// The cap on assets under management
    pub aum_cap: U256,
    /// The referral bonus rate of each referral level, in basis points
    pub referral_rates: Vec<u16>,
}

/// `n` whole tokens of 18 decimals
fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

/// A tier rule
fn tier(label: &str, min: U256, max: U256, bps: u16, from: u8, to: u8) -> TierRule {
    TierRule {
        label: label.to_string(),
        min_threshold: min,
        max_threshold: max,
        bonus_rate_bps: bps,
        lock_index_from: from,
        lock_index_to: to,
    }
}

impl Default for SetupParams {
    fn default() -> Self {
        Self {
            durations: vec![7776000, 15552000, 23328000, 31536000, 63072000, 94608000],
            bonus_rates: vec![0, 0, 0, 50, 75, 100],
            tiers: vec![
                tier("Bronze", tokens(100), tokens(1_000), 0, 0, 5),
                tier("Silver", tokens(1_000), tokens(10_000), 25, 0, 5),
                tier("Gold", tokens(10_000), tokens(100_000), 50, 2, 5),
                tier("Diamond", tokens(100_000), U256::MAX, 100, 3, 5),
            ],
            aum_cap: tokens(1_000_000_000),
            referral_rates: vec![0, 600, 200, 200, 100, 100, 100, 100],
        }
    }
}

/// Render a list as an array literal, e.g. `[1,2,3]`
fn array_literal<T: ToString>(values: &[T]) -> String {
    format!("[{}]", values.iter().map(ToString::to_string).join(","))
}

impl SetupParams {
    /// Load parameters from a JSON file, or the defaults if none is given
    pub fn load(path: Option<&Path>) -> Result<Self, DeployError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = fs::read_to_string(path)
            .map_err(|e| DeployError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| DeployError::Config(format!("{}: {}", path.display(), e)))
    }

    /// The configuration batch applying these parameters, in submission order
    pub fn calls(&self) -> Vec<ConfigCall> {
        let mut calls = vec![ConfigCall::new(
            SET_DURATIONS_FUNCTION,
            vec![
                CallArg::literal(array_literal(&self.durations)),
                CallArg::literal(array_literal(&self.bonus_rates)),
            ],
        )];

        calls.extend(self.tiers.iter().map(|tier| {
            ConfigCall::new(
                INSERT_TIER_FUNCTION,
                vec![
                    CallArg::string(&tier.label),
                    CallArg::literal(tier.min_threshold),
                    CallArg::literal(tier.max_threshold),
                    CallArg::literal(tier.bonus_rate_bps),
                    CallArg::literal(tier.lock_index_from),
                    CallArg::literal(tier.lock_index_to),
                ],
            )
        }));

        calls.push(ConfigCall::new(
            SET_AUM_CAP_FUNCTION,
            vec![CallArg::literal(self.aum_cap)],
        ));
        calls.push(ConfigCall::new(
            SET_REFERRAL_RATES_FUNCTION,
            vec![CallArg::literal(array_literal(&self.referral_rates))],
        ));

        calls
    }
}
