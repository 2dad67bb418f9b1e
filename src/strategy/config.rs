//! Thresholds for the spread scanning pipeline

use serde::{Deserialize, Serialize};

use crate::models::{DriftModel, DEFAULT_GREEKS_RATE, DEFAULT_HV_WINDOW};

/// Earnings inside this many calendar days block a trade
pub const EVENT_HORIZON_DAYS: i64 = 5;

/// Net position |delta| must stay below this
pub const MAX_ABS_DELTA: f64 = 0.5;

/// Net position gamma must stay below this, independent of `max_vega`
pub const MAX_GAMMA: f64 = 0.1;

/// Configuration for one bull call spread scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Skip the scan when the IV percentile exceeds this (0-100)
    /// Default: 50
    pub iv_percentile_threshold: f64,

    /// A leg needs strictly more volume than this
    /// Default: 100
    pub min_volume: u64,

    /// A leg needs (ask - bid) / last below this
    /// Default: 0.1
    pub max_spread_ratio: f64,

    /// Net position vega (per vol point) must stay below this
    /// Default: 1.0
    pub max_vega: f64,

    /// Minimum profit probability in percent
    /// Default: 60
    pub min_probability: f64,

    /// Target delta for the long (lower strike) call
    /// Default: 0.3
    pub long_delta: f64,

    /// Target delta for the short (higher strike) call
    /// Default: 0.2
    pub short_delta: f64,

    /// Risk-free rate used for per-contract Greeks
    /// Default: 0.01
    pub greeks_rate: f64,

    /// Drift assumption for the probability estimate
    pub drift: DriftModel,

    /// Rolling window (returns) for the IV percentile
    /// Default: 21
    pub hv_window: usize,

    /// Apply the liquidity gate to both legs once resolved
    /// Default: true
    pub require_liquidity: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            iv_percentile_threshold: 50.0,
            min_volume: 100,
            max_spread_ratio: 0.1,
            max_vega: 1.0,
            min_probability: 60.0,
            long_delta: 0.3,
            short_delta: 0.2,
            greeks_rate: DEFAULT_GREEKS_RATE,
            drift: DriftModel::default(),
            hv_window: DEFAULT_HV_WINDOW,
            require_liquidity: true,
        }
    }
}

impl StrategyConfig {
    /// Range checks; returns a description of the first violation
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.iv_percentile_threshold) {
            return Err(format!(
                "iv_percentile_threshold must be within 0-100, got {}",
                self.iv_percentile_threshold
            ));
        }
        if !(0.0..=100.0).contains(&self.min_probability) {
            return Err(format!(
                "min_probability must be within 0-100, got {}",
                self.min_probability
            ));
        }
        if !(self.max_spread_ratio > 0.0) {
            return Err("max_spread_ratio must be positive".into());
        }
        if !(self.max_vega > 0.0) {
            return Err("max_vega must be positive".into());
        }
        for (name, delta) in [("long_delta", self.long_delta), ("short_delta", self.short_delta)] {
            if !(delta > 0.0 && delta < 1.0) {
                return Err(format!("{name} must be within (0, 1), got {delta}"));
            }
        }
        if self.short_delta >= self.long_delta {
            return Err("short_delta must be below long_delta for a bull call spread".into());
        }
        if self.hv_window < 2 {
            return Err("hv_window must be at least 2".into());
        }
        Ok(())
    }
}
