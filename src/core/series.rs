//! Underlying price history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Ordered price history for one underlying (oldest first)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Self {
        Self { bars }
    }

    /// Series carrying only closes, one bar per day ending at `end`
    pub fn from_closes(closes: &[f64], end: DateTime<Utc>) -> Self {
        let n = closes.len() as i64;
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: end - chrono::Duration::days(n - 1 - i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0,
            })
            .collect();
        Self { bars }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Closing prices, oldest first
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Last close (spot)
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}
