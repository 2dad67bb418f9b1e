//! Watchlist driver
//!
//! Glues a [`MarketDataSource`] to the [`SignalAssembler`]. A failed fetch is
//! not an error here: it becomes a `DataUnavailable` rejection so one bad
//! ticker never stops the rest of the watchlist.

use chrono::{DateTime, Utc};

use crate::core::{MarketSnapshot, Signal};
use crate::data::MarketDataSource;
use crate::models::{
    historical_volatility, round_probability, spread_probability_mc, GbmParams, SimulationConfig,
    DAYS_PER_YEAR, HORIZON_DAYS, TRADING_DAYS,
};
use crate::notify::NotificationQueue;
use crate::strategy::{RejectReason, ScanOutcome, ScanStage, SignalAssembler, StrategyConfig};

/// Result of scanning one ticker
#[derive(Debug, Clone)]
pub struct TickerScan {
    pub ticker: String,
    pub outcome: ScanOutcome,
    /// Snapshot the decision was made on; `None` when the fetch failed
    pub snapshot: Option<MarketSnapshot>,
}

pub struct Scanner<S> {
    source: S,
    assembler: SignalAssembler,
}

impl<S: MarketDataSource> Scanner<S> {
    pub fn new(source: S, config: StrategyConfig) -> Self {
        Self {
            source,
            assembler: SignalAssembler::with_config(config),
        }
    }

    pub fn assembler(&self) -> &SignalAssembler {
        &self.assembler
    }

    pub fn scan_ticker(&self, ticker: &str, now: DateTime<Utc>) -> TickerScan {
        match self.source.fetch_snapshot(ticker, now) {
            Ok(snapshot) => TickerScan {
                ticker: ticker.to_string(),
                outcome: self.assembler.scan(&snapshot, now),
                snapshot: Some(snapshot),
            },
            Err(e) => {
                if e.is_data_unavailable() {
                    tracing::warn!(ticker, "Data unavailable: {}", e);
                } else {
                    tracing::error!(ticker, "Unexpected fetch failure: {}", e);
                }
                TickerScan {
                    ticker: ticker.to_string(),
                    outcome: ScanOutcome::Rejected {
                        stage: ScanStage::Idle,
                        reason: RejectReason::DataUnavailable(e.to_string()),
                    },
                    snapshot: None,
                }
            }
        }
    }

    /// Scan every ticker in order, forwarding signals to `queue` when given
    pub fn scan_watchlist(
        &self,
        tickers: &[String],
        now: DateTime<Utc>,
        queue: Option<&NotificationQueue>,
    ) -> Vec<TickerScan> {
        let results: Vec<TickerScan> = tickers
            .iter()
            .map(|ticker| {
                let scan = self.scan_ticker(ticker, now);
                if let (Some(queue), Some(signal)) = (queue, scan.outcome.signal()) {
                    queue.notify_signal(signal);
                }
                scan
            })
            .collect();

        let signals = results.iter().filter(|r| r.outcome.is_signal()).count();
        tracing::info!(
            tickers = results.len(),
            signals,
            "Watchlist scan complete"
        );
        results
    }
}

/// Simulated probability for a signal's strikes over the same horizon, in
/// percent. `None` when volatility or drift cannot be estimated.
pub fn monte_carlo_check(
    snapshot: &MarketSnapshot,
    signal: &Signal,
    config: &StrategyConfig,
) -> Option<f64> {
    let closes = snapshot.prices.closes();
    let sigma = historical_volatility(&closes).filter(|s| *s > 0.0)?;
    let mu = config.drift.rate(&closes)?;
    let steps = (HORIZON_DAYS / DAYS_PER_YEAR * TRADING_DAYS).round() as usize;

    let params = GbmParams {
        spot: signal.entry_price,
        mu,
        sigma,
    };
    let sim = SimulationConfig {
        days: steps + 1,
        ..Default::default()
    };

    let p = spread_probability_mc(&params, signal.long_strike(), signal.short_strike(), &sim);
    Some(round_probability(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ScanError, ScanResult};

    struct Unreachable;

    impl MarketDataSource for Unreachable {
        fn fetch_snapshot(&self, _ticker: &str, _now: DateTime<Utc>) -> ScanResult<MarketSnapshot> {
            Err(ScanError::network("connection refused"))
        }
    }

    struct Empty;

    impl MarketDataSource for Empty {
        fn fetch_snapshot(&self, ticker: &str, _now: DateTime<Utc>) -> ScanResult<MarketSnapshot> {
            Ok(MarketSnapshot::new(ticker))
        }
    }

    #[test]
    fn test_fetch_failure_becomes_rejection() {
        let scanner = Scanner::new(Unreachable, StrategyConfig::default());
        let scan = scanner.scan_ticker("NVDA", Utc::now());

        assert!(scan.snapshot.is_none());
        match scan.outcome {
            ScanOutcome::Rejected { stage, reason } => {
                assert_eq!(stage, ScanStage::Idle);
                assert!(matches!(reason, RejectReason::DataUnavailable(msg) if msg.contains("refused")));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_watchlist_keeps_going() {
        let scanner = Scanner::new(Empty, StrategyConfig::default());
        let tickers = vec!["NVDA".to_string(), "AMD".to_string()];
        let results = scanner.scan_watchlist(&tickers, Utc::now(), None);

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].ticker, "AMD");
        assert!(results.iter().all(|r| !r.outcome.is_signal()));
    }
}
