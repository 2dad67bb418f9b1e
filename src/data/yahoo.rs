//! Yahoo Finance data fetcher
//!
//! Fetches daily price history, the nearest-expiry option chain and upcoming
//! earnings dates through Yahoo Finance's unofficial API, and packages them as
//! a [`MarketSnapshot`].
//!
//! Note: Yahoo Finance data is delayed ~15 minutes and intended for personal use.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;

use super::MarketDataSource;
use crate::core::{
    ChainRow, MarketSnapshot, OptionType, PriceBar, PriceSeries, ScanError, ScanResult,
};

/// Symbols without an earnings calendar
const NO_EARNINGS: &[&str] = &["QQQ", "SPY"];

/// Yahoo Finance API client
pub struct YahooClient {
    client: reqwest::blocking::Client,
    base_url: String,
    history_range: String,
}

impl YahooClient {
    pub fn new() -> ScanResult<Self> {
        Self::with_base_url("https://query1.finance.yahoo.com")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> ScanResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36")
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScanError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            history_range: "1y".to_string(),
        })
    }

    /// History range passed to the chart endpoint (e.g. "6mo", "1y")
    pub fn history_range(mut self, range: impl Into<String>) -> Self {
        self.history_range = range.into();
        self
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> ScanResult<T> {
        tracing::debug!("GET {}", url);
        self.client
            .get(url)
            .send()
            .map_err(|e| ScanError::network(e.to_string()))?
            .error_for_status()
            .map_err(|e| ScanError::network(e.to_string()))?
            .json()
            .map_err(|e| ScanError::data(format!("Failed to parse {url}: {e}")))
    }

    /// Daily OHLCV history for the configured range
    pub fn get_price_history(&self, symbol: &str) -> ScanResult<PriceSeries> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url, symbol, self.history_range
        );
        let response: YahooChartResponse = self.get_json(&url)?;
        parse_chart(response)
    }

    /// Get available option expiration dates
    pub fn get_expirations(&self, symbol: &str) -> ScanResult<Vec<NaiveDate>> {
        let url = format!("{}/v7/finance/options/{}", self.base_url, symbol);
        let response: YahooOptionsResponse = self.get_json(&url)?;

        let chain = response
            .option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ScanError::data("No options data returned"))?;

        Ok(chain
            .expiration_dates
            .iter()
            .filter_map(|&ts| DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()))
            .collect())
    }

    /// Chain rows for `expiry`, or for the nearest listed expiry when `None`
    pub fn get_chain_rows(
        &self,
        symbol: &str,
        expiry: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ScanResult<Vec<ChainRow>> {
        let expiry = match expiry {
            Some(e) => e,
            None => self
                .get_expirations(symbol)?
                .into_iter()
                .find(|e| *e >= today)
                .ok_or_else(|| ScanError::data(format!("{symbol} has no listed expirations")))?,
        };

        let expiry_ts = expiry
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| ScanError::invalid_input(format!("bad expiry {expiry}")))?;

        let url = format!(
            "{}/v7/finance/options/{}?date={}",
            self.base_url, symbol, expiry_ts
        );
        let response: YahooOptionsResponse = self.get_json(&url)?;
        let chain = response
            .option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ScanError::data("No options data returned"))?;

        tracing::info!(symbol, %expiry, "Fetched option chain");
        Ok(chain_rows(&chain.options, expiry, today))
    }

    /// Upcoming earnings timestamps (none for broad ETFs)
    pub fn get_earnings_dates(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> ScanResult<Vec<DateTime<Utc>>> {
        if NO_EARNINGS.iter().any(|etf| symbol.eq_ignore_ascii_case(etf)) {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=calendarEvents",
            self.base_url, symbol
        );
        let response: YahooSummaryResponse = self.get_json(&url)?;
        Ok(parse_earnings(response, now))
    }
}

impl MarketDataSource for YahooClient {
    fn fetch_snapshot(&self, ticker: &str, now: DateTime<Utc>) -> ScanResult<MarketSnapshot> {
        let prices = self.get_price_history(ticker)?;
        let chain = self.get_chain_rows(ticker, None, now.date_naive())?;
        let earnings_dates = self.get_earnings_dates(ticker, now)?;

        Ok(MarketSnapshot {
            ticker: ticker.to_string(),
            prices,
            chain,
            earnings_dates,
        })
    }
}

fn parse_chart(response: YahooChartResponse) -> ScanResult<PriceSeries> {
    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ScanError::data("No chart data returned"))?;
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ScanError::data("Chart without quote indicators"))?;

    let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

    // Bars with a missing close are skipped, like dropna on the provider table
    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let close = at(&quote.close, i)?;
            Some(PriceBar {
                timestamp: DateTime::from_timestamp(ts, 0)?,
                open: at(&quote.open, i).unwrap_or(close),
                high: at(&quote.high, i).unwrap_or(close),
                low: at(&quote.low, i).unwrap_or(close),
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            })
        })
        .collect();

    Ok(PriceSeries::new(bars))
}

fn chain_rows(options: &[YahooOptions], expiry: NaiveDate, today: NaiveDate) -> Vec<ChainRow> {
    let days = (expiry - today).num_days();
    let Some(options) = options.first() else {
        return Vec::new();
    };

    let convert = |data: &YahooOptionData, option_type: OptionType| ChainRow {
        strike: data.strike,
        bid: data.bid,
        ask: data.ask,
        last_price: data.last_price,
        volume: data.volume.map(|v| v.max(0) as u64),
        implied_volatility: data.implied_volatility,
        option_type: Some(option_type),
        expiration: Some(expiry),
        days_to_expire: Some(days),
    };

    options
        .calls
        .iter()
        .map(|c| convert(c, OptionType::Call))
        .chain(options.puts.iter().map(|p| convert(p, OptionType::Put)))
        .collect()
}

fn parse_earnings(response: YahooSummaryResponse, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    response
        .quote_summary
        .result
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| r.calendar_events)
        .filter_map(|c| c.earnings)
        .flat_map(|e| e.earnings_date)
        .filter_map(|d| DateTime::from_timestamp(d.raw, 0))
        // Date-valued stamps: keep a release dated today
        .filter(|d| d.date_naive() >= now.date_naive())
        .collect()
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooChartResult>>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: YahooOptionChain,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChain {
    result: Vec<YahooOptionChainData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChainData {
    #[serde(rename = "expirationDates", default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<YahooOptions>,
}

#[derive(Debug, Deserialize)]
struct YahooOptions {
    #[serde(default)]
    calls: Vec<YahooOptionData>,
    #[serde(default)]
    puts: Vec<YahooOptionData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionData {
    strike: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    #[serde(rename = "lastPrice")]
    last_price: Option<f64>,
    volume: Option<i64>,
    #[serde(rename = "impliedVolatility")]
    implied_volatility: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: YahooSummary,
}

#[derive(Debug, Deserialize)]
struct YahooSummary {
    result: Option<Vec<YahooSummaryResult>>,
}

#[derive(Debug, Deserialize)]
struct YahooSummaryResult {
    #[serde(rename = "calendarEvents")]
    calendar_events: Option<YahooCalendarEvents>,
}

#[derive(Debug, Deserialize)]
struct YahooCalendarEvents {
    earnings: Option<YahooEarnings>,
}

#[derive(Debug, Deserialize)]
struct YahooEarnings {
    #[serde(rename = "earningsDate", default)]
    earnings_date: Vec<YahooRawTimestamp>,
}

#[derive(Debug, Deserialize)]
struct YahooRawTimestamp {
    raw: i64,
}
