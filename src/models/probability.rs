//! Spread profit probability under a log-normal terminal price
//!
//! For a bull call spread the profitable band is `long < S_T < short`, so the
//! probability is `P(S_T > long) - P(S_T > short)` with `P(S_T > K) = N(d1(K))`
//! over a fixed 30 calendar day horizon.

use serde::{Deserialize, Serialize};

use super::black_scholes::{norm_cdf, DAYS_PER_YEAR};
use super::volatility::{annualized_mean_return, historical_volatility};

/// Evaluation horizon in calendar days
pub const HORIZON_DAYS: f64 = 30.0;

/// Risk-free rate for the risk-neutral drift
pub const RISK_NEUTRAL_RATE: f64 = 0.05;

/// Drift assumed for the underlying over the horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DriftModel {
    /// Drift at a fixed risk-free rate
    RiskNeutral { rate: f64 },
    /// Drift at the annualized mean log return of the series
    Historical,
}

impl Default for DriftModel {
    fn default() -> Self {
        DriftModel::RiskNeutral {
            rate: RISK_NEUTRAL_RATE,
        }
    }
}

impl DriftModel {
    /// Annualized drift for `closes`; `None` when it cannot be estimated
    pub fn rate(&self, closes: &[f64]) -> Option<f64> {
        match self {
            DriftModel::RiskNeutral { rate } => Some(*rate),
            DriftModel::Historical => annualized_mean_return(closes),
        }
    }
}

/// P(S_T > strike) for a log-normal terminal price
pub fn prob_above(spot: f64, strike: f64, rate: f64, sigma: f64, time: f64) -> f64 {
    let d1 = ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * time) / (sigma * time.sqrt());
    norm_cdf(d1)
}

/// Probability in percent (0-100) that a bull call spread finishes in its
/// profitable band at the horizon.
///
/// Returns 0 when volatility cannot be estimated (fewer than two closes or zero
/// realized vol), when inputs are non-positive, or when the strikes coincide.
pub fn spread_probability(
    spot: f64,
    long_strike: f64,
    short_strike: f64,
    closes: &[f64],
    drift: DriftModel,
) -> f64 {
    let inputs_ok = [spot, long_strike, short_strike]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0);
    if !inputs_ok || long_strike == short_strike {
        return 0.0;
    }

    let sigma = match historical_volatility(closes) {
        Some(s) if s.is_finite() && s > 0.0 => s,
        _ => return 0.0,
    };
    let rate = match drift.rate(closes) {
        Some(r) if r.is_finite() => r,
        _ => return 0.0,
    };

    let time = HORIZON_DAYS / DAYS_PER_YEAR;
    let p = prob_above(spot, long_strike, rate, sigma, time)
        - prob_above(spot, short_strike, rate, sigma, time);

    if p.is_finite() {
        (p * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Round to two decimals, the precision signals are published with
pub fn round_probability(p: f64) -> f64 {
    (p * 100.0).round() / 100.0
}
