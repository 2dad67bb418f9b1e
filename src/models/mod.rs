//! Pricing and probability models
//!
//! Implements:
//! - Black-Scholes (pricing, closed-form Greeks)
//! - Realized volatility and IV percentile
//! - Log-normal spread profit probability
//! - Monte Carlo cross-check for the probability estimate

pub mod black_scholes;
pub mod monte_carlo;
pub mod probability;
pub mod volatility;

pub use black_scholes::*;
pub use monte_carlo::*;
pub use probability::*;
pub use volatility::*;
