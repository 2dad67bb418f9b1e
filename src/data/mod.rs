//! Market data collaborators
//!
//! Handles:
//! - Yahoo Finance API for price history, option chains and earnings dates
//! - Local snapshot recording and offline replay

pub mod cache;
pub mod yahoo;

pub use cache::*;
pub use yahoo::*;

use chrono::{DateTime, Utc};

use crate::core::{MarketSnapshot, ScanResult};

/// Anything that can produce the inputs for one scan of one ticker.
///
/// Errors from a source are not fatal to the scanner; they become a
/// data-unavailable rejection for that ticker.
pub trait MarketDataSource {
    fn fetch_snapshot(&self, ticker: &str, now: DateTime<Utc>) -> ScanResult<MarketSnapshot>;
}

impl<S: MarketDataSource + ?Sized> MarketDataSource for &S {
    fn fetch_snapshot(&self, ticker: &str, now: DateTime<Utc>) -> ScanResult<MarketSnapshot> {
        (**self).fetch_snapshot(ticker, now)
    }
}

impl<S: MarketDataSource + ?Sized> MarketDataSource for Box<S> {
    fn fetch_snapshot(&self, ticker: &str, now: DateTime<Utc>) -> ScanResult<MarketSnapshot> {
        (**self).fetch_snapshot(ticker, now)
    }
}
