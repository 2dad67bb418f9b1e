//! SignalAssembler - runs one scan of one ticker
//!
//! Stages, in order:
//! `Idle -> DataLoaded -> EarningsChecked -> VolatilityChecked -> StrikesSelected
//!  -> ContractsResolved -> GreeksAggregated -> ProbabilityEvaluated`
//! ending in either a [`Signal`] or a [`RejectReason`]. Cheap gates run first so
//! most rejections never touch the Greeks math.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{
    aggregate_greeks, Greeks, MarketSnapshot, OptionChain, OptionContract, PositionSide, Signal,
    StrategyType,
};
use crate::models::{calculate_greeks, iv_percentile, round_probability, spread_probability};

use super::config::StrategyConfig;
use super::risk::{earnings_within_horizon, GreekExposure, LiquidityCheck, RiskGate};
use super::strike_selector::{select_bull_call_strikes, LegSelection};

/// Pipeline state a scan had reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStage {
    Idle,
    DataLoaded,
    EarningsChecked,
    VolatilityChecked,
    StrikesSelected,
    ContractsResolved,
    GreeksAggregated,
    ProbabilityEvaluated,
}

/// Why a scan produced no signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// A collaborator could not supply data
    DataUnavailable(String),
    EmptyPriceSeries,
    InvalidSpot(f64),
    EmptyChain,
    /// Chain rows lack a required field
    MissingColumns(String),
    EarningsWithinHorizon(DateTime<Utc>),
    VolatilityUnavailable,
    IvPercentileTooHigh { percentile: f64, threshold: f64 },
    NoLongLeg { target_delta: f64 },
    NoShortLeg { target_delta: f64 },
    /// Both legs landed on the same strike
    DegenerateSpread { strike: f64 },
    ContractNotFound { strike: f64 },
    Illiquid { strike: f64, check: LiquidityCheck },
    ProbabilityBelowFloor { probability: f64, floor: f64 },
    ExcessiveGreeks { greeks: Greeks, exposure: GreekExposure },
}

impl RejectReason {
    /// Short machine-friendly code
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::DataUnavailable(_) => "data_unavailable",
            RejectReason::EmptyPriceSeries => "empty_price_series",
            RejectReason::InvalidSpot(_) => "invalid_spot",
            RejectReason::EmptyChain => "empty_chain",
            RejectReason::MissingColumns(_) => "missing_columns",
            RejectReason::EarningsWithinHorizon(_) => "earnings_risk",
            RejectReason::VolatilityUnavailable => "volatility_unavailable",
            RejectReason::IvPercentileTooHigh { .. } => "iv_percentile_too_high",
            RejectReason::NoLongLeg { .. } => "no_long_leg",
            RejectReason::NoShortLeg { .. } => "no_short_leg",
            RejectReason::DegenerateSpread { .. } => "degenerate_spread",
            RejectReason::ContractNotFound { .. } => "contract_not_found",
            RejectReason::Illiquid { .. } => "illiquid",
            RejectReason::ProbabilityBelowFloor { .. } => "probability_below_floor",
            RejectReason::ExcessiveGreeks { .. } => "excessive_greeks",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::DataUnavailable(msg) => write!(f, "data unavailable: {msg}"),
            RejectReason::EmptyPriceSeries => write!(f, "no price history"),
            RejectReason::InvalidSpot(spot) => write!(f, "invalid spot {spot}"),
            RejectReason::EmptyChain => write!(f, "empty option chain"),
            RejectReason::MissingColumns(msg) => write!(f, "option chain unusable: {msg}"),
            RejectReason::EarningsWithinHorizon(date) => {
                write!(f, "earnings on {} inside the event window", date.date_naive())
            }
            RejectReason::VolatilityUnavailable => write!(f, "not enough history for IV percentile"),
            RejectReason::IvPercentileTooHigh {
                percentile,
                threshold,
            } => write!(f, "IV percentile {percentile:.1} above {threshold:.1}"),
            RejectReason::NoLongLeg { target_delta } => {
                write!(f, "no call near delta {target_delta} for the long leg")
            }
            RejectReason::NoShortLeg { target_delta } => {
                write!(f, "no call near delta {target_delta} for the short leg")
            }
            RejectReason::DegenerateSpread { strike } => {
                write!(f, "both legs selected strike {strike}")
            }
            RejectReason::ContractNotFound { strike } => write!(f, "no call listed at {strike}"),
            RejectReason::Illiquid { strike, check } => write!(
                f,
                "call {strike} illiquid (volume ok: {}, spread ratio: {:?})",
                check.volume_ok, check.spread_ratio
            ),
            RejectReason::ProbabilityBelowFloor { probability, floor } => {
                write!(f, "probability {probability:.2}% below {floor:.2}%")
            }
            RejectReason::ExcessiveGreeks { greeks, exposure } => write!(
                f,
                "greek limits breached (delta {:.3} ok={}, vega {:.3} ok={}, gamma {:.4} ok={})",
                greeks.delta,
                exposure.delta_ok,
                greeks.vega,
                exposure.vega_ok,
                greeks.gamma,
                exposure.gamma_ok
            ),
        }
    }
}

/// Result of one scan. Rejection is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanOutcome {
    Signal(Signal),
    Rejected {
        /// Last stage the scan completed before the rejecting check
        stage: ScanStage,
        reason: RejectReason,
    },
}

impl ScanOutcome {
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            ScanOutcome::Signal(signal) => Some(signal),
            ScanOutcome::Rejected { .. } => None,
        }
    }

    pub fn into_signal(self) -> Option<Signal> {
        match self {
            ScanOutcome::Signal(signal) => Some(signal),
            ScanOutcome::Rejected { .. } => None,
        }
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            ScanOutcome::Signal(_) => None,
            ScanOutcome::Rejected { reason, .. } => Some(reason),
        }
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, ScanOutcome::Signal(_))
    }
}

type StageResult<T> = Result<T, (ScanStage, RejectReason)>;

fn reject<T>(stage: ScanStage, reason: RejectReason) -> StageResult<T> {
    Err((stage, reason))
}

/// Main facade for the bull call spread pipeline
#[derive(Debug, Clone, Default)]
pub struct SignalAssembler {
    config: StrategyConfig,
}

impl SignalAssembler {
    /// Create with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Scan at the current wall-clock time
    pub fn scan_now(&self, snapshot: &MarketSnapshot) -> ScanOutcome {
        self.scan(snapshot, Utc::now())
    }

    /// Run the full pipeline on one snapshot, evaluated as of `now`.
    ///
    /// Deterministic: the same snapshot and `now` always give the same outcome.
    pub fn scan(&self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> ScanOutcome {
        match self.run(snapshot, now) {
            Ok(signal) => {
                tracing::info!(
                    ticker = %signal.ticker,
                    long = signal.strikes.0,
                    short = signal.strikes.1,
                    probability = signal.probability,
                    "Signal emitted"
                );
                ScanOutcome::Signal(signal)
            }
            Err((stage, reason)) => {
                tracing::debug!(
                    ticker = %snapshot.ticker,
                    stage = ?stage,
                    code = reason.code(),
                    "Scan rejected: {}",
                    reason
                );
                ScanOutcome::Rejected { stage, reason }
            }
        }
    }

    fn run(&self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> StageResult<Signal> {
        let cfg = &self.config;
        let gate = RiskGate::from_config(cfg);

        // Idle -> DataLoaded
        let (spot, closes, chain) = load_data(snapshot)?;

        // DataLoaded -> EarningsChecked
        if let Some(date) = earnings_within_horizon(&snapshot.earnings_dates, now) {
            return reject(
                ScanStage::DataLoaded,
                RejectReason::EarningsWithinHorizon(date),
            );
        }

        // EarningsChecked -> VolatilityChecked
        let percentile = chain
            .mean_call_iv()
            .and_then(|iv| iv_percentile(iv, &closes, cfg.hv_window));
        let Some(percentile) = percentile else {
            return reject(ScanStage::EarningsChecked, RejectReason::VolatilityUnavailable);
        };
        if percentile > cfg.iv_percentile_threshold {
            return reject(
                ScanStage::EarningsChecked,
                RejectReason::IvPercentileTooHigh {
                    percentile,
                    threshold: cfg.iv_percentile_threshold,
                },
            );
        }

        // VolatilityChecked -> StrikesSelected
        let pair = match select_bull_call_strikes(
            &chain,
            spot,
            cfg.long_delta,
            cfg.short_delta,
            cfg.greeks_rate,
        ) {
            LegSelection::Selected(pair) => pair,
            LegSelection::MissingLong => {
                return reject(
                    ScanStage::VolatilityChecked,
                    RejectReason::NoLongLeg {
                        target_delta: cfg.long_delta,
                    },
                )
            }
            LegSelection::MissingShort => {
                return reject(
                    ScanStage::VolatilityChecked,
                    RejectReason::NoShortLeg {
                        target_delta: cfg.short_delta,
                    },
                )
            }
        };
        if pair.is_degenerate() {
            return reject(
                ScanStage::VolatilityChecked,
                RejectReason::DegenerateSpread { strike: pair.long },
            );
        }

        // StrikesSelected -> ContractsResolved
        let long = resolve_call(&chain, pair.long)?;
        let short = resolve_call(&chain, pair.short)?;
        if cfg.require_liquidity {
            for leg in [long, short] {
                let check = gate.liquidity(leg);
                if !check.passes() {
                    return reject(
                        ScanStage::StrikesSelected,
                        RejectReason::Illiquid {
                            strike: leg.strike,
                            check,
                        },
                    );
                }
            }
        }

        // ContractsResolved -> GreeksAggregated
        let leg_greeks = |c: &OptionContract| {
            calculate_greeks(
                c.option_type,
                c.strike,
                spot,
                c.days_to_expire,
                c.implied_volatility,
                cfg.greeks_rate,
            )
        };
        let net = aggregate_greeks(&[
            (leg_greeks(long), PositionSide::Long),
            (leg_greeks(short), PositionSide::Short),
        ]);

        // GreeksAggregated -> ProbabilityEvaluated
        let probability = round_probability(spread_probability(
            spot,
            pair.long,
            pair.short,
            &closes,
            cfg.drift,
        ));

        // Final gate
        if !gate.meets_probability_floor(probability) {
            return reject(
                ScanStage::ProbabilityEvaluated,
                RejectReason::ProbabilityBelowFloor {
                    probability,
                    floor: cfg.min_probability,
                },
            );
        }
        let exposure = gate.greek_exposure(&net);
        if !exposure.passes() {
            return reject(
                ScanStage::ProbabilityEvaluated,
                RejectReason::ExcessiveGreeks {
                    greeks: net,
                    exposure,
                },
            );
        }

        Ok(Signal {
            ticker: snapshot.ticker.clone(),
            strategy_type: StrategyType::BullCallSpread,
            strikes: (pair.long, pair.short),
            probability,
            entry_price: spot,
            net_debit: long.ask - short.bid,
            expiration: long.expiration,
            greeks: net,
            generated_at: now,
        })
    }
}

fn load_data(snapshot: &MarketSnapshot) -> StageResult<(f64, Vec<f64>, OptionChain)> {
    let Some(spot) = snapshot.prices.last_close() else {
        return reject(ScanStage::Idle, RejectReason::EmptyPriceSeries);
    };
    if !spot.is_finite() || spot <= 0.0 {
        return reject(ScanStage::Idle, RejectReason::InvalidSpot(spot));
    }
    if snapshot.chain.is_empty() {
        return reject(ScanStage::Idle, RejectReason::EmptyChain);
    }

    let chain = match OptionChain::from_rows(&snapshot.chain) {
        Ok(chain) if !chain.is_empty() => chain,
        Ok(_) => return reject(ScanStage::Idle, RejectReason::EmptyChain),
        Err(e) => return reject(ScanStage::Idle, RejectReason::MissingColumns(e.to_string())),
    };

    Ok((spot, snapshot.prices.closes(), chain))
}

fn resolve_call(chain: &OptionChain, strike: f64) -> StageResult<&OptionContract> {
    match chain.call_at(strike) {
        Some(contract) => Ok(contract),
        None => reject(
            ScanStage::StrikesSelected,
            RejectReason::ContractNotFound { strike },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChainRow, OptionType, PriceSeries};
    use chrono::{Duration, NaiveDate};

    fn closes() -> Vec<f64> {
        let step = 0.15 / 252f64.sqrt();
        let mut closes = vec![400.0];
        for i in 1..253 {
            let r = if i % 2 == 1 { step } else { -step };
            closes.push(closes[i - 1] * r.exp());
        }
        // End exactly at 400 so spot is known
        let last = *closes.last().unwrap();
        closes.iter().map(|c| c * 400.0 / last).collect()
    }

    fn call_row(strike: f64) -> ChainRow {
        ChainRow {
            strike: Some(strike),
            bid: Some(2.0),
            ask: Some(2.1),
            last_price: Some(2.05),
            volume: Some(1_000),
            implied_volatility: Some(0.15),
            option_type: Some(OptionType::Call),
            expiration: NaiveDate::from_ymd_opt(2025, 7, 18),
            days_to_expire: Some(30),
        }
    }

    fn snapshot(now: DateTime<Utc>) -> MarketSnapshot {
        MarketSnapshot {
            ticker: "NVDA".into(),
            prices: PriceSeries::from_closes(&closes(), now),
            chain: [390.0, 400.0, 410.0, 420.0, 430.0]
                .iter()
                .map(|&k| call_row(k))
                .collect(),
            earnings_dates: vec![now + Duration::days(20)],
        }
    }

    fn assembler(min_probability: f64) -> SignalAssembler {
        SignalAssembler::with_config(StrategyConfig {
            min_probability,
            ..Default::default()
        })
    }

    fn rejection(outcome: &ScanOutcome) -> (ScanStage, RejectReason) {
        match outcome {
            ScanOutcome::Rejected { stage, reason } => (*stage, reason.clone()),
            ScanOutcome::Signal(s) => panic!("expected rejection, got {s:?}"),
        }
    }

    #[test]
    fn test_emits_signal() {
        let now = Utc::now();
        let outcome = assembler(10.0).scan(&snapshot(now), now);
        let signal = outcome.signal().expect("signal");

        assert_eq!(signal.strikes, (410.0, 420.0));
        assert_eq!(signal.strategy_type, StrategyType::BullCallSpread);
        assert!(signal.greeks.delta > 0.0 && signal.greeks.delta < 0.3);
        assert!((signal.entry_price - 400.0).abs() < 1e-9);
        assert!((signal.net_debit - 0.1).abs() < 1e-9);
        assert_eq!(signal.generated_at, now);
    }

    #[test]
    fn test_empty_inputs_reject_at_idle() {
        let now = Utc::now();
        let mut no_prices = snapshot(now);
        no_prices.prices = PriceSeries::default();
        assert_eq!(
            rejection(&assembler(10.0).scan(&no_prices, now)),
            (ScanStage::Idle, RejectReason::EmptyPriceSeries)
        );

        let mut no_chain = snapshot(now);
        no_chain.chain.clear();
        assert_eq!(
            rejection(&assembler(10.0).scan(&no_chain, now)),
            (ScanStage::Idle, RejectReason::EmptyChain)
        );

        let mut no_iv = snapshot(now);
        for row in &mut no_iv.chain {
            row.implied_volatility = None;
        }
        let (stage, reason) = rejection(&assembler(10.0).scan(&no_iv, now));
        assert_eq!(stage, ScanStage::Idle);
        assert_eq!(reason.code(), "missing_columns");
    }

    #[test]
    fn test_earnings_gate() {
        let now = Utc::now();
        let mut snap = snapshot(now);
        snap.earnings_dates = vec![now + Duration::days(5)];

        let (stage, reason) = rejection(&assembler(10.0).scan(&snap, now));
        assert_eq!(stage, ScanStage::DataLoaded);
        assert_eq!(reason, RejectReason::EarningsWithinHorizon(now + Duration::days(5)));
    }

    #[test]
    fn test_volatility_gate() {
        let now = Utc::now();
        let mut snap = snapshot(now);
        for row in &mut snap.chain {
            row.implied_volatility = Some(0.60);
        }

        let (stage, reason) = rejection(&assembler(10.0).scan(&snap, now));
        assert_eq!(stage, ScanStage::EarningsChecked);
        assert_eq!(
            reason,
            RejectReason::IvPercentileTooHigh {
                percentile: 100.0,
                threshold: 50.0
            }
        );

        let mut short_history = snapshot(now);
        short_history.prices = PriceSeries::from_closes(&closes()[..10], now);
        assert_eq!(
            rejection(&assembler(10.0).scan(&short_history, now)).1,
            RejectReason::VolatilityUnavailable
        );
    }

    #[test]
    fn test_single_strike_chain_is_degenerate() {
        let now = Utc::now();
        let mut snap = snapshot(now);
        snap.chain = vec![call_row(410.0)];

        let (stage, reason) = rejection(&assembler(10.0).scan(&snap, now));
        assert_eq!(stage, ScanStage::VolatilityChecked);
        assert_eq!(reason, RejectReason::DegenerateSpread { strike: 410.0 });
    }

    #[test]
    fn test_liquidity_gate_on_resolved_legs() {
        let now = Utc::now();
        let mut snap = snapshot(now);
        snap.chain[3].volume = Some(10); // 420 call

        let (stage, reason) = rejection(&assembler(10.0).scan(&snap, now));
        assert_eq!(stage, ScanStage::StrikesSelected);
        assert_eq!(reason.code(), "illiquid");

        let relaxed = SignalAssembler::with_config(StrategyConfig {
            min_probability: 10.0,
            require_liquidity: false,
            ..Default::default()
        });
        assert!(relaxed.scan(&snap, now).is_signal());
    }

    #[test]
    fn test_probability_floor() {
        let now = Utc::now();
        let (stage, reason) = rejection(&assembler(55.0).scan(&snapshot(now), now));

        assert_eq!(stage, ScanStage::ProbabilityEvaluated);
        match reason {
            RejectReason::ProbabilityBelowFloor { probability, floor } => {
                assert_eq!(floor, 55.0);
                assert!(probability > 10.0 && probability < 55.0);
            }
            other => panic!("unexpected reason {other:?}"),
        }
    }

    #[test]
    fn test_greek_exposure_gate() {
        let now = Utc::now();
        let tight = SignalAssembler::with_config(StrategyConfig {
            min_probability: 10.0,
            max_vega: 0.01,
            ..Default::default()
        });

        let (stage, reason) = rejection(&tight.scan(&snapshot(now), now));
        assert_eq!(stage, ScanStage::ProbabilityEvaluated);
        match reason {
            RejectReason::ExcessiveGreeks { exposure, .. } => {
                assert!(!exposure.vega_ok);
                assert!(exposure.delta_ok && exposure.gamma_ok);
            }
            other => panic!("unexpected reason {other:?}"),
        }
    }

    #[test]
    fn test_rescan_is_bit_identical() {
        let now = Utc::now();
        let snap = snapshot(now);
        let assembler = assembler(10.0);

        let a = assembler.scan(&snap, now).into_signal().unwrap();
        let b = assembler.scan(&snap, now).into_signal().unwrap();

        assert_eq!(a, b);
        assert_eq!(a.probability.to_bits(), b.probability.to_bits());
        assert_eq!(a.greeks.delta.to_bits(), b.greeks.delta.to_bits());
    }
}
