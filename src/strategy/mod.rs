//! Bull call spread scanning
//!
//! Turns a [`MarketSnapshot`](crate::core::MarketSnapshot) into a trade signal
//! or a typed rejection:
//! 1. **Risk gates**: event risk, IV percentile, liquidity
//! 2. **Strike selection**: long and short calls by nearest delta
//! 3. **Evaluation**: net Greeks, profit probability, final limits

mod assembler;
mod config;
mod risk;
mod strike_selector;

pub use assembler::*;
pub use config::*;
pub use risk::*;
pub use strike_selector::*;
