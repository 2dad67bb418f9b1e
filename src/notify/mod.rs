//! Signal notification
//!
//! Signals are rendered to a Markdown message and handed to a [`Notifier`].
//! The scanner never calls a notifier directly; it pushes onto a bounded
//! [`NotificationQueue`] drained by a background worker.

pub mod queue;
pub mod telegram;

pub use queue::*;
pub use telegram::*;

use crate::core::{ScanResult, Signal};

/// Delivery channel for rendered signal messages
pub trait Notifier: Send + 'static {
    fn send(&self, message: &str) -> ScanResult<()>;

    fn name(&self) -> &'static str;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn send(&self, message: &str) -> ScanResult<()> {
        tracing::info!(target: "spread_scanner::notify", "\n{}", message);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Markdown body for a signal
pub fn format_signal_message(signal: &Signal) -> String {
    let g = signal.greeks.rounded(4);
    format!(
        "📈 *{ticker}* `{strategy}`\n\
         Buy {long:.2}C / Sell {short:.2}C exp {expiry}\n\
         Spot: {spot:.2}  Debit: {debit:.2}  Max profit: {max_profit:.2}\n\
         Probability: {prob:.2}%\n\
         Δ {delta}  Γ {gamma}  Θ {theta}  V {vega}\n\
         _{at}_",
        ticker = signal.ticker,
        strategy = signal.strategy_type,
        long = signal.long_strike(),
        short = signal.short_strike(),
        expiry = signal.expiration,
        spot = signal.entry_price,
        debit = signal.net_debit,
        max_profit = signal.max_profit(),
        prob = signal.probability,
        delta = g.delta,
        gamma = g.gamma,
        theta = g.theta,
        vega = g.vega,
        at = signal.generated_at.format("%Y-%m-%d %H:%M UTC"),
    )
}
