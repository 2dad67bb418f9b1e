//! Local snapshot storage
//!
//! Records fetched market snapshots as JSON so a scan can be replayed offline
//! against exactly the data it saw.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use super::MarketDataSource;
use crate::core::{MarketSnapshot, ScanError, ScanResult};

/// Directory of `<TICKER>_snapshot.json` files
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> ScanResult<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir
            .join(format!("{}_snapshot.json", ticker.to_ascii_uppercase()))
    }

    pub fn save(&self, snapshot: &MarketSnapshot) -> ScanResult<PathBuf> {
        let path = self.path_for(&snapshot.ticker);
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ScanError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;

        tracing::info!("Saved snapshot for {} at {:?}", snapshot.ticker, path);
        Ok(path)
    }

    /// `Ok(None)` when nothing was recorded for `ticker`
    pub fn load(&self, ticker: &str) -> ScanResult<Option<MarketSnapshot>> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        let snapshot = serde_json::from_str(&json)
            .map_err(|e| ScanError::Serialization(format!("{}: {e}", path.display())))?;
        Ok(Some(snapshot))
    }

    /// Tickers with a recorded snapshot, sorted
    pub fn list(&self) -> ScanResult<Vec<String>> {
        let mut tickers = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(ticker) = name.strip_suffix("_snapshot.json") {
                tickers.push(ticker.to_string());
            }
        }
        tickers.sort();
        Ok(tickers)
    }
}

impl MarketDataSource for SnapshotStore {
    fn fetch_snapshot(&self, ticker: &str, _now: DateTime<Utc>) -> ScanResult<MarketSnapshot> {
        self.load(ticker)?
            .ok_or_else(|| ScanError::data(format!("no recorded snapshot for {ticker}")))
    }
}

/// Wraps a live source and records every snapshot it returns
pub struct RecordingSource<S> {
    inner: S,
    store: SnapshotStore,
}

impl<S: MarketDataSource> RecordingSource<S> {
    pub fn new(inner: S, store: SnapshotStore) -> Self {
        Self { inner, store }
    }
}

impl<S: MarketDataSource> MarketDataSource for RecordingSource<S> {
    fn fetch_snapshot(&self, ticker: &str, now: DateTime<Utc>) -> ScanResult<MarketSnapshot> {
        let snapshot = self.inner.fetch_snapshot(ticker, now)?;
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!("Could not record snapshot for {}: {}", ticker, e);
        }
        Ok(snapshot)
    }
}
