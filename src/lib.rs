//! # Spread Scanner - Vertical Spread Signal Generation
//!
//! Scans a watchlist of underlyings for bull call spread opportunities and
//! emits a trade signal only when every risk gate passes.
//!
//! ## Overview
//!
//! One scan of one ticker runs a fixed pipeline over a [`MarketSnapshot`]:
//! - **Event risk**: no earnings within the next five days
//! - **Volatility**: implied vol cheap relative to realized (IV percentile)
//! - **Strike selection**: long and short calls chosen by Black-Scholes delta
//! - **Evaluation**: net Greeks limits and a log-normal profit probability
//!
//! Every scan ends in either a [`Signal`] or a typed rejection.
//!
//! ## Key Components
//!
//! - **Data Fetching**: Yahoo Finance (history, chains, earnings), snapshot replay
//! - **Models**: Black-Scholes Greeks, realized volatility, probability, Monte Carlo
//! - **Strategy**: strike selector, risk gates, signal assembler
//! - **Notification**: bounded queue with Telegram or console delivery
//!
//! ## Usage
//!
//! ```rust,no_run
//! use spread_scanner::prelude::*;
//! use chrono::Utc;
//!
//! let client = YahooClient::new().unwrap();
//! let scanner = Scanner::new(client, StrategyConfig::default());
//!
//! let scan = scanner.scan_ticker("NVDA", Utc::now());
//! match scan.outcome {
//!     ScanOutcome::Signal(signal) => println!("{}", format_signal_message(&signal)),
//!     ScanOutcome::Rejected { reason, .. } => println!("no trade: {reason}"),
//! }
//! ```
//!
//! ## What This Crate Does NOT Do
//!
//! - Place orders or track positions
//! - Price exotics or fit a volatility surface
//! - Handle dividends or early exercise (European Black-Scholes only)

pub mod config;
pub mod core;
pub mod data;
pub mod models;
pub mod notify;
pub mod scanner;
pub mod strategy;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        ChainRow, Greeks, MarketSnapshot, OptionChain, OptionContract, OptionType, PriceSeries,
        ScanError, ScanResult, Signal, StrategyType,
    };

    // Configuration
    pub use crate::config::{ConfigLayer, ScannerConfig};

    // Data fetching
    pub use crate::data::{MarketDataSource, SnapshotStore, YahooClient};

    // Models
    pub use crate::models::{
        calculate_greeks, historical_volatility, iv_percentile, spread_probability,
        spread_probability_mc, DriftModel, GbmParams, SimulationConfig,
    };

    // Scanning
    pub use crate::scanner::{monte_carlo_check, Scanner, TickerScan};
    pub use crate::strategy::{
        RejectReason, RiskGate, ScanOutcome, ScanStage, SignalAssembler, StrategyConfig,
    };

    // Notification
    pub use crate::notify::{
        format_signal_message, ConsoleNotifier, NotificationQueue, Notifier, OverflowPolicy,
        TelegramNotifier,
    };
}

// Re-export main types at crate root
pub use crate::core::{ScanError, ScanResult};
pub use crate::strategy::{ScanOutcome, SignalAssembler};
