//! Risk gates
//!
//! Independent pass/fail checks. Each one is pure; the assembler decides where
//! in the pipeline they run.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Greeks, OptionContract};

use super::config::{StrategyConfig, EVENT_HORIZON_DAYS, MAX_ABS_DELTA, MAX_GAMMA};

/// First earnings date inside `[today, now + 5 days]`, if any.
///
/// The lower bound is the calendar date of `now`: providers stamp earnings at
/// midnight, so a release later today carries a timestamp before `now`.
pub fn earnings_within_horizon(
    earnings_dates: &[DateTime<Utc>],
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    let horizon = now + Duration::days(EVENT_HORIZON_DAYS);
    earnings_dates
        .iter()
        .copied()
        .filter(|d| d.date_naive() >= today && *d <= horizon)
        .min()
}

/// True when an earnings release falls inside the event horizon
pub fn has_event_risk(earnings_dates: &[DateTime<Utc>], now: DateTime<Utc>) -> bool {
    earnings_within_horizon(earnings_dates, now).is_some()
}

/// Outcome of the liquidity check for one contract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityCheck {
    pub volume_ok: bool,
    /// `None` when the ratio is undefined (no last price)
    pub spread_ratio: Option<f64>,
    pub spread_ok: bool,
}

impl LiquidityCheck {
    pub fn evaluate(contract: &OptionContract, min_volume: u64, max_spread_ratio: f64) -> Self {
        let volume_ok = contract.volume > min_volume;
        let spread_ratio = if contract.last_price > 0.0 {
            Some(contract.spread() / contract.last_price)
        } else {
            None
        };
        let spread_ok = spread_ratio.map_or(false, |r| r < max_spread_ratio);

        Self {
            volume_ok,
            spread_ratio,
            spread_ok,
        }
    }

    pub fn passes(&self) -> bool {
        self.volume_ok && self.spread_ok
    }
}

/// Net position Greek limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreekExposure {
    pub delta_ok: bool,
    pub vega_ok: bool,
    pub gamma_ok: bool,
}

impl GreekExposure {
    pub fn evaluate(greeks: &Greeks, max_vega: f64) -> Self {
        Self {
            delta_ok: greeks.delta.abs() < MAX_ABS_DELTA,
            vega_ok: greeks.vega < max_vega,
            gamma_ok: greeks.gamma < MAX_GAMMA,
        }
    }

    pub fn passes(&self) -> bool {
        self.delta_ok && self.vega_ok && self.gamma_ok
    }
}

/// Threshold-bound view over the individual checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskGate {
    pub min_volume: u64,
    pub max_spread_ratio: f64,
    pub max_vega: f64,
    pub min_probability: f64,
}

impl RiskGate {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            min_volume: config.min_volume,
            max_spread_ratio: config.max_spread_ratio,
            max_vega: config.max_vega,
            min_probability: config.min_probability,
        }
    }

    pub fn event_risk(&self, earnings_dates: &[DateTime<Utc>], now: DateTime<Utc>) -> bool {
        has_event_risk(earnings_dates, now)
    }

    pub fn liquidity(&self, contract: &OptionContract) -> LiquidityCheck {
        LiquidityCheck::evaluate(contract, self.min_volume, self.max_spread_ratio)
    }

    pub fn greek_exposure(&self, greeks: &Greeks) -> GreekExposure {
        GreekExposure::evaluate(greeks, self.max_vega)
    }

    pub fn meets_probability_floor(&self, probability: f64) -> bool {
        probability >= self.min_probability
    }
}
