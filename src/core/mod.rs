//! Core data types for the spread scanner
//!
//! Defines fundamental types:
//! - OptionContract / OptionChain: validated chain snapshot
//! - Greeks: per-contract and per-position sensitivities
//! - PriceSeries: underlying OHLCV history
//! - MarketSnapshot / Signal: scan input and output

pub mod error;
pub mod greeks;
pub mod option;
pub mod series;
pub mod signal;

pub use error::*;
pub use greeks::*;
pub use option::*;
pub use series::*;
pub use signal::*;
