//! Black-Scholes Model
//!
//! Provides:
//! - European option pricing
//! - Closed-form Greeks
//! - `calculate_greeks`, the guarded entry point used when scanning chains
//!
//! Rates are continuously compounded; the underlying pays no dividend.

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erfc;

use crate::core::{Greeks, OptionType};

/// Calendar days per year used for time-to-expiry
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Floor applied to implied volatility before it enters d1/d2
pub const MIN_VOLATILITY: f64 = 0.0001;

/// Default risk-free rate for per-contract Greeks
pub const DEFAULT_GREEKS_RATE: f64 = 0.01;

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes d1 parameter
pub fn d1(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    ((spot / strike).ln() + (rate + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

/// Black-Scholes d2 parameter
pub fn d2(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    d1(spot, strike, rate, vol, time) - vol * time.sqrt()
}

/// Year fraction for a day count, floored at one day
pub fn year_fraction(days_to_expire: u32) -> f64 {
    days_to_expire.max(1) as f64 / DAYS_PER_YEAR
}

/// Black-Scholes European option price
pub fn price(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    time: f64,
    option_type: OptionType,
) -> f64 {
    if time <= 0.0 {
        return option_type.intrinsic(spot, strike);
    }

    let df = (-rate * time).exp();
    if vol <= 0.0 {
        let forward = spot * (rate * time).exp();
        return df * option_type.intrinsic(forward, strike);
    }

    let d1 = d1(spot, strike, rate, vol, time);
    let d2 = d2(spot, strike, rate, vol, time);

    match option_type {
        OptionType::Call => spot * norm_cdf(d1) - strike * df * norm_cdf(d2),
        OptionType::Put => strike * df * norm_cdf(-d2) - spot * norm_cdf(-d1),
    }
}

/// Black-Scholes Greeks without input guards.
///
/// Theta is per calendar day and vega per 1 vol point.
pub fn greeks(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    time: f64,
    option_type: OptionType,
) -> Greeks {
    let d1 = d1(spot, strike, rate, vol, time);
    let d2 = d1 - vol * time.sqrt();
    let df = (-rate * time).exp();
    let sqrt_t = time.sqrt();
    let pdf_d1 = norm_pdf(d1);

    let delta = match option_type {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    };

    // Same for call and put
    let gamma = pdf_d1 / (spot * vol * sqrt_t);
    let vega = spot * pdf_d1 * sqrt_t / 100.0;

    let decay = -spot * pdf_d1 * vol / (2.0 * sqrt_t);
    let theta = match option_type {
        OptionType::Call => decay - rate * strike * df * norm_cdf(d2),
        OptionType::Put => decay + rate * strike * df * norm_cdf(-d2),
    };

    Greeks::new(delta, gamma, theta / DAYS_PER_YEAR, vega)
}

/// Greeks for one listed contract.
///
/// Strike, spot and implied volatility must be finite and positive, days are
/// floored to one and IV to [`MIN_VOLATILITY`]. Anything that cannot be priced
/// yields [`Greeks::zero`] so a single bad row never aborts a chain scan.
pub fn calculate_greeks(
    option_type: OptionType,
    strike: f64,
    spot: f64,
    days_to_expire: u32,
    implied_vol: f64,
    rate: f64,
) -> Greeks {
    let valid = [strike, spot, implied_vol]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0);
    if !valid || !rate.is_finite() {
        return Greeks::zero();
    }

    let time = year_fraction(days_to_expire);
    let vol = implied_vol.max(MIN_VOLATILITY);
    let g = greeks(spot, strike, rate, vol, time, option_type);

    if g.is_finite() {
        g
    } else {
        Greeks::zero()
    }
}
