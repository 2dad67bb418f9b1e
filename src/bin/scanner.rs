//! Spread scanner CLI
//!
//! `scan` evaluates one ticker and prints the decision; `watch` runs the
//! watchlist on a fixed interval and pushes signals to the notifier.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spread_scanner::data::RecordingSource;
use spread_scanner::prelude::*;

#[derive(Parser)]
#[command(name = "spread-scanner", version, about = "Bull call spread signal scanner")]
struct Cli {
    /// YAML config file (missing file means defaults)
    #[arg(long, global = true, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Record every fetched snapshot into this directory
    #[arg(long, global = true)]
    record: Option<PathBuf>,

    /// Read snapshots from this directory instead of the network
    #[arg(long, global = true, conflicts_with = "record")]
    replay: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one ticker and print the outcome
    Scan {
        #[arg(long, short)]
        ticker: String,

        /// Also print a Monte Carlo estimate of the probability
        #[arg(long)]
        mc_check: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scan the watchlist now and then on every interval
    Watch {
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Stop after this many rounds
        #[arg(long)]
        rounds: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "spread_scanner=info".into()))
        .init();

    let cli = Cli::parse();
    let config = ScannerConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    let source = build_source(&cli)?;

    match cli.command {
        Command::Scan {
            ticker,
            mc_check,
            json,
        } => run_scan(source, &config, &ticker.to_ascii_uppercase(), mc_check, json),
        Command::Watch {
            interval_secs,
            rounds,
        } => {
            let interval = interval_secs.unwrap_or(config.scan.interval_secs).max(1);
            run_watch(source, &config, Duration::from_secs(interval), rounds)
        }
    }
}

fn build_source(cli: &Cli) -> anyhow::Result<Box<dyn MarketDataSource>> {
    if let Some(dir) = &cli.replay {
        info!("Replaying snapshots from {}", dir.display());
        return Ok(Box::new(SnapshotStore::new(dir)?));
    }

    let client = YahooClient::new().context("creating Yahoo Finance client")?;
    let source: Box<dyn MarketDataSource> = match &cli.record {
        Some(dir) => {
            info!("Recording snapshots to {}", dir.display());
            Box::new(RecordingSource::new(client, SnapshotStore::new(dir)?))
        }
        None => Box::new(client),
    };
    Ok(source)
}

fn run_scan(
    source: Box<dyn MarketDataSource>,
    config: &ScannerConfig,
    ticker: &str,
    mc_check: bool,
    json: bool,
) -> anyhow::Result<()> {
    let scanner = Scanner::new(source, config.strategy.clone());
    let scan = scanner.scan_ticker(ticker, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&scan.outcome)?);
    } else {
        match &scan.outcome {
            ScanOutcome::Signal(signal) => println!("{}", format_signal_message(signal)),
            ScanOutcome::Rejected { stage, reason } => {
                println!("{ticker}: no signal ({}) after {:?}: {reason}", reason.code(), stage)
            }
        }
    }

    if mc_check {
        match (&scan.snapshot, scan.outcome.signal()) {
            (Some(snapshot), Some(signal)) => {
                match monte_carlo_check(snapshot, signal, &config.strategy) {
                    Some(p) => println!(
                        "Monte Carlo: {p:.2}% vs closed form {:.2}%",
                        signal.probability
                    ),
                    None => println!("Monte Carlo: volatility unavailable"),
                }
            }
            _ => println!("Monte Carlo: skipped, no signal"),
        }
    }

    Ok(())
}

fn build_notifier(config: &ScannerConfig) -> anyhow::Result<NotificationQueue> {
    let n = &config.notification;
    let queue = match n.telegram_credentials() {
        Some((token, chat_id)) => {
            let notifier = TelegramNotifier::new(token, chat_id)?;
            NotificationQueue::start(notifier, n.queue_capacity, n.overflow)
        }
        None => {
            warn!("Telegram credentials not set, signals go to the log");
            NotificationQueue::start(ConsoleNotifier, n.queue_capacity, n.overflow)
        }
    };
    Ok(queue)
}

fn run_watch(
    source: Box<dyn MarketDataSource>,
    config: &ScannerConfig,
    interval: Duration,
    rounds: Option<u64>,
) -> anyhow::Result<()> {
    let queue = build_notifier(config)?;
    let scanner = Scanner::new(source, config.strategy.clone());

    info!(
        watchlist = ?config.watchlist,
        interval_secs = interval.as_secs(),
        "Starting watch loop"
    );

    let mut round = 0u64;
    loop {
        let started = Instant::now();
        scanner.scan_watchlist(&config.watchlist, Utc::now(), Some(&queue));
        round += 1;

        if rounds.is_some_and(|max| round >= max) {
            break;
        }
        if let Some(rest) = interval.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    let stats = queue.shutdown();
    info!(
        delivered = stats.delivered,
        failed = stats.failed,
        dropped = stats.dropped,
        "Notification queue drained"
    );
    Ok(())
}
