//! Scanner inputs and outputs: the market snapshot a scan consumes and the
//! trade signal it may produce.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::greeks::Greeks;
use super::option::ChainRow;
use super::series::PriceSeries;

/// Everything a single scan of one ticker needs, already fetched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    pub prices: PriceSeries,
    pub chain: Vec<ChainRow>,
    pub earnings_dates: Vec<DateTime<Utc>>,
}

impl MarketSnapshot {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }
}

/// Supported spread strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    BullCallSpread,
}

impl StrategyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::BullCallSpread => "bull_call_spread",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade signal emitted when every risk gate passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ticker: String,
    pub strategy_type: StrategyType,
    /// (long strike, short strike), long < short
    pub strikes: (f64, f64),
    /// Profit probability in percent, two decimals
    pub probability: f64,
    /// Underlying spot at scan time
    pub entry_price: f64,
    /// Long ask minus short bid
    pub net_debit: f64,
    pub expiration: NaiveDate,
    /// Net position Greeks (long minus short)
    pub greeks: Greeks,
    pub generated_at: DateTime<Utc>,
}

impl Signal {
    pub fn long_strike(&self) -> f64 {
        self.strikes.0
    }

    pub fn short_strike(&self) -> f64 {
        self.strikes.1
    }

    /// Spread width between the legs
    pub fn width(&self) -> f64 {
        self.strikes.1 - self.strikes.0
    }

    /// Best case at expiry per share: width less the debit paid
    pub fn max_profit(&self) -> f64 {
        (self.width() - self.net_debit).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Signal {
        Signal {
            ticker: "NVDA".into(),
            strategy_type: StrategyType::BullCallSpread,
            strikes: (410.0, 420.0),
            probability: 17.25,
            entry_price: 400.0,
            net_debit: 3.1,
            expiration: NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            greeks: Greeks::new(0.16, 0.004, -0.05, 0.15),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_signal_json_shape() {
        let value = serde_json::to_value(sample()).unwrap();

        assert_eq!(value["strategy_type"], "bull_call_spread");
        assert_eq!(value["strikes"][0], 410.0);
        assert_eq!(value["strikes"][1], 420.0);
        for key in ["delta", "gamma", "vega", "theta"] {
            assert!(value["greeks"].get(key).is_some(), "missing greek {key}");
        }
    }

    #[test]
    fn test_payoff_helpers() {
        let s = sample();
        assert_eq!(s.width(), 10.0);
        assert!((s.max_profit() - 6.9).abs() < 1e-12);
    }
}
