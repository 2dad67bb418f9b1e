//! Realized volatility and IV percentile
//!
//! Everything here works on closing prices (oldest first) and annualizes with
//! 252 trading days. Standard deviations are sample (n - 1) estimates.

/// Trading days per year used for annualization
pub const TRADING_DAYS: f64 = 252.0;

/// Default rolling window for the IV percentile (about one trading month)
pub const DEFAULT_HV_WINDOW: usize = 21;

/// Log returns ln(P_t / P_{t-1}); pairs with a non-positive price are skipped
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0 && w[0].is_finite() && w[1].is_finite())
        .map(|w| (w[1] / w[0]).ln())
        .collect()
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation, `None` with fewer than two observations
pub fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(var.sqrt())
}

/// Annualized historical volatility of the whole series
pub fn historical_volatility(closes: &[f64]) -> Option<f64> {
    sample_std(&log_returns(closes)).map(|s| s * TRADING_DAYS.sqrt())
}

/// Annualized mean log return, the real-world drift estimate
pub fn annualized_mean_return(closes: &[f64]) -> Option<f64> {
    let returns = log_returns(closes);
    if returns.is_empty() {
        None
    } else {
        Some(mean(&returns) * TRADING_DAYS)
    }
}

/// Annualized volatility over each trailing window of `window` returns
pub fn rolling_volatility(closes: &[f64], window: usize) -> Vec<f64> {
    if window < 2 {
        return Vec::new();
    }
    log_returns(closes)
        .windows(window)
        .filter_map(sample_std)
        .map(|s| s * TRADING_DAYS.sqrt())
        .collect()
}

/// Where the current implied volatility sits against realized history.
///
/// Percentage (0-100) of rolling historical-volatility observations strictly
/// below `current_iv`. `None` when the history is too short for one window.
pub fn iv_percentile(current_iv: f64, closes: &[f64], window: usize) -> Option<f64> {
    if !current_iv.is_finite() || current_iv <= 0.0 {
        return None;
    }
    let history = rolling_volatility(closes, window);
    if history.is_empty() {
        return None;
    }
    let below = history.iter().filter(|&&hv| hv < current_iv).count();
    Some(below as f64 / history.len() as f64 * 100.0)
}
