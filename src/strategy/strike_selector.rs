//! Delta-targeted strike selection
//!
//! Picks the listing whose Black-Scholes delta is nearest a target. A computed
//! delta of exactly zero marks an unpriceable row (see `calculate_greeks`) and
//! is never selected.

use crate::core::{Greeks, OptionChain, OptionContract, OptionType};
use crate::models::calculate_greeks;

/// A contract chosen for its delta
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaSelection<'a> {
    pub contract: &'a OptionContract,
    pub greeks: Greeks,
}

impl DeltaSelection<'_> {
    pub fn strike(&self) -> f64 {
        self.contract.strike
    }

    pub fn delta(&self) -> f64 {
        self.greeks.delta
    }
}

/// Nearest `|delta - target|` among candidates; ties keep the first seen.
pub fn select_nearest_delta<'a, I>(candidates: I, target_delta: f64) -> Option<DeltaSelection<'a>>
where
    I: IntoIterator<Item = (&'a OptionContract, Greeks)>,
{
    let mut best: Option<(f64, DeltaSelection<'a>)> = None;

    for (contract, greeks) in candidates {
        if greeks.delta == 0.0 || !greeks.delta.is_finite() {
            continue;
        }
        let distance = (greeks.delta - target_delta).abs();
        let closer = match &best {
            Some((best_distance, _)) => distance < *best_distance,
            None => true,
        };
        if closer {
            best = Some((distance, DeltaSelection { contract, greeks }));
        }
    }

    best.map(|(_, selection)| selection)
}

/// Compute Greeks for every contract of `option_type` and pick the one nearest
/// `target_delta`. `None` when the chain has no priceable contract of that type.
pub fn select_by_delta(
    chain: &OptionChain,
    option_type: OptionType,
    target_delta: f64,
    spot: f64,
    rate: f64,
) -> Option<DeltaSelection<'_>> {
    let candidates = chain.of_type(option_type).map(|c| {
        let greeks = calculate_greeks(
            c.option_type,
            c.strike,
            spot,
            c.days_to_expire,
            c.implied_volatility,
            rate,
        );
        (c, greeks)
    });

    select_nearest_delta(candidates, target_delta)
}

/// Strikes of a vertical spread, ascending
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikePair {
    pub long: f64,
    pub short: f64,
}

impl StrikePair {
    /// Order two selected strikes so the long leg is the lower one
    pub fn ordered(a: f64, b: f64) -> Self {
        if a <= b {
            Self { long: a, short: b }
        } else {
            Self { long: b, short: a }
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.long == self.short
    }
}

/// Result of selecting both legs of a bull call spread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegSelection {
    Selected(StrikePair),
    MissingLong,
    MissingShort,
}

/// Select the long (near `long_delta`) and short (near `short_delta`) calls.
pub fn select_bull_call_strikes(
    chain: &OptionChain,
    spot: f64,
    long_delta: f64,
    short_delta: f64,
    rate: f64,
) -> LegSelection {
    let Some(long) = select_by_delta(chain, OptionType::Call, long_delta, spot, rate) else {
        return LegSelection::MissingLong;
    };
    let Some(short) = select_by_delta(chain, OptionType::Call, short_delta, spot, rate) else {
        return LegSelection::MissingShort;
    };

    tracing::debug!(
        long_strike = long.strike(),
        long_delta = long.delta(),
        short_strike = short.strike(),
        short_delta = short.delta(),
        "Selected spread legs by delta"
    );

    LegSelection::Selected(StrikePair::ordered(long.strike(), short.strike()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn call(strike: f64, iv: f64) -> OptionContract {
        OptionContract {
            strike,
            bid: 1.0,
            ask: 1.1,
            last_price: 1.05,
            volume: 1_000,
            implied_volatility: iv,
            option_type: OptionType::Call,
            expiration: NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            days_to_expire: 30,
        }
    }

    fn put(strike: f64) -> OptionContract {
        OptionContract {
            option_type: OptionType::Put,
            ..call(strike, 0.2)
        }
    }

    fn with_delta(delta: f64) -> Greeks {
        Greeks::new(delta, 0.01, -0.02, 0.1)
    }

    #[test]
    fn test_nearest_delta_synthetic_chain() {
        let contracts: Vec<_> = [90.0, 95.0, 100.0, 105.0, 110.0]
            .iter()
            .map(|&k| call(k, 0.2))
            .collect();
        let deltas = [0.8, 0.6, 0.45, 0.25, 0.1];

        let picked = select_nearest_delta(
            contracts.iter().zip(deltas).map(|(c, d)| (c, with_delta(d))),
            0.3,
        )
        .unwrap();

        assert_eq!(picked.strike(), 105.0);
        assert_eq!(picked.delta(), 0.25);
    }

    #[test]
    fn test_ties_keep_chain_order() {
        // 0.25 and 0.75 sit exactly 0.25 from 0.5 in binary
        let contracts = [call(100.0, 0.2), call(110.0, 0.2)];
        let picked = select_nearest_delta(
            [(&contracts[0], with_delta(0.75)), (&contracts[1], with_delta(0.25))],
            0.5,
        )
        .unwrap();
        assert_eq!(picked.strike(), 100.0);

        let reversed = select_nearest_delta(
            [(&contracts[1], with_delta(0.25)), (&contracts[0], with_delta(0.75))],
            0.5,
        )
        .unwrap();
        assert_eq!(reversed.strike(), 110.0);
    }

    #[test]
    fn test_zero_delta_is_discarded() {
        let contracts = [call(100.0, 0.2), call(150.0, 0.2)];
        let picked = select_nearest_delta(
            [(&contracts[0], with_delta(0.6)), (&contracts[1], with_delta(0.0))],
            0.05,
        )
        .unwrap();
        assert_eq!(picked.strike(), 100.0);

        let none = select_nearest_delta([(&contracts[1], with_delta(0.0))], 0.3);
        assert!(none.is_none());
    }

    #[test]
    fn test_select_by_delta_uses_black_scholes() {
        let chain = OptionChain::new(
            [90.0, 95.0, 100.0, 105.0, 110.0]
                .iter()
                .map(|&k| call(k, 0.2))
                .chain([put(100.0)])
                .collect(),
        );

        let picked = select_by_delta(&chain, OptionType::Call, 0.3, 100.0, 0.01).unwrap();
        assert_eq!(picked.strike(), 105.0);
        assert!(picked.delta() > 0.15 && picked.delta() < 0.3);

        let put_pick = select_by_delta(&chain, OptionType::Put, -0.5, 100.0, 0.01).unwrap();
        assert_eq!(put_pick.strike(), 100.0);
    }

    #[test]
    fn test_empty_and_unpriceable_chains() {
        let empty = OptionChain::default();
        assert!(select_by_delta(&empty, OptionType::Call, 0.3, 100.0, 0.01).is_none());

        let puts_only = OptionChain::new(vec![put(100.0)]);
        assert!(select_by_delta(&puts_only, OptionType::Call, 0.3, 100.0, 0.01).is_none());

        // Zero IV degrades to zero Greeks, which are discarded
        let unpriceable = OptionChain::new(vec![call(100.0, 0.0)]);
        assert!(select_by_delta(&unpriceable, OptionType::Call, 0.3, 100.0, 0.01).is_none());
    }

    #[test]
    fn test_bull_call_strikes_are_ordered() {
        let chain = OptionChain::new(
            [390.0, 400.0, 410.0, 420.0, 430.0]
                .iter()
                .map(|&k| call(k, 0.15))
                .collect(),
        );

        match select_bull_call_strikes(&chain, 400.0, 0.3, 0.2, 0.01) {
            LegSelection::Selected(pair) => {
                assert_eq!(pair.long, 410.0);
                assert_eq!(pair.short, 420.0);
            }
            other => panic!("unexpected selection {other:?}"),
        }

        // Targets given the wrong way round still produce long < short
        match select_bull_call_strikes(&chain, 400.0, 0.2, 0.3, 0.01) {
            LegSelection::Selected(pair) => assert!(pair.long < pair.short),
            other => panic!("unexpected selection {other:?}"),
        }

        assert_eq!(
            select_bull_call_strikes(&OptionChain::default(), 400.0, 0.3, 0.2, 0.01),
            LegSelection::MissingLong
        );
    }

    #[test]
    fn test_strike_pair() {
        assert_eq!(StrikePair::ordered(420.0, 410.0), StrikePair { long: 410.0, short: 420.0 });
        assert!(StrikePair::ordered(410.0, 410.0).is_degenerate());
    }
}
