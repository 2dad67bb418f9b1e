//! Monte Carlo cross-check for spread probabilities
//!
//! Simulates geometric Brownian motion paths on a trading-day grid and counts
//! terminal prices inside the spread's profitable band. Seeded with ChaCha8 so
//! the same inputs always produce the same estimate.

use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use super::volatility::TRADING_DAYS;

/// Default simulation count
pub const DEFAULT_SIMULATIONS: usize = 10_000;

/// Default seed
pub const DEFAULT_SEED: u64 = 42;

/// Geometric Brownian motion for the underlying
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GbmParams {
    /// Starting price
    pub spot: f64,
    /// Annualized drift
    pub mu: f64,
    /// Annualized volatility
    pub sigma: f64,
}

/// Simulation grid and sampling controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    /// Columns per path, spot included
    pub days: usize,
    pub n_sims: usize,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            days: 22,
            n_sims: DEFAULT_SIMULATIONS,
            seed: DEFAULT_SEED,
        }
    }
}

/// Simulate GBM price paths.
///
/// Returns an `n_sims x days` grid; column 0 is the spot and each following
/// column is one trading day later.
pub fn simulate_paths(params: &GbmParams, sim: &SimulationConfig) -> Array2<f64> {
    let mut paths = Array2::zeros((sim.n_sims, sim.days.max(1)));
    let mut rng = ChaCha8Rng::seed_from_u64(sim.seed);

    let GbmParams { spot, mu, sigma } = *params;
    let dt = 1.0 / TRADING_DAYS;
    let drift = (mu - 0.5 * sigma * sigma) * dt;
    let diffusion = sigma * dt.sqrt();

    for mut path in paths.rows_mut() {
        path[0] = spot;
        for t in 1..path.len() {
            let z: f64 = Distribution::<f64>::sample(&StandardNormal, &mut rng);
            path[t] = path[t - 1] * (drift + diffusion * z).exp();
        }
    }

    paths
}

/// Fraction of paths whose final price is above `strike`
pub fn itm_probability(paths: &Array2<f64>, strike: f64) -> f64 {
    let n = paths.nrows();
    if n == 0 || paths.ncols() == 0 {
        return 0.0;
    }
    let last = paths.ncols() - 1;
    let above = paths.column(last).iter().filter(|&&s| s > strike).count();
    above as f64 / n as f64
}

/// Simulated bull call spread probability in percent
pub fn spread_probability_mc(
    params: &GbmParams,
    long_strike: f64,
    short_strike: f64,
    sim: &SimulationConfig,
) -> f64 {
    if long_strike >= short_strike || params.sigma <= 0.0 || params.spot <= 0.0 {
        return 0.0;
    }
    let paths = simulate_paths(params, sim);
    (itm_probability(&paths, long_strike) - itm_probability(&paths, short_strike)) * 100.0
}
