//! Option contract definitions
//!
//! `ChainRow` is the loosely-typed row a data provider hands over; `OptionContract`
//! is the validated form the scanner works with. Validation happens once, at
//! `OptionChain::from_rows`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ScanError;

/// Strikes closer than this are the same listing
pub const STRIKE_TOLERANCE: f64 = 0.01;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Payoff direction: +1 for call, -1 for put
    pub fn phi(&self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "calls" | "c" => Ok(OptionType::Call),
            "put" | "puts" | "p" => Ok(OptionType::Put),
            other => Err(ScanError::invalid_input(format!("unknown option type '{other}'"))),
        }
    }
}

/// One row of an option-chain table as delivered by a data provider.
///
/// Every field is optional; a provider may omit columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRow {
    pub strike: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last_price: Option<f64>,
    pub volume: Option<u64>,
    pub implied_volatility: Option<f64>,
    #[serde(rename = "type")]
    pub option_type: Option<OptionType>,
    pub expiration: Option<NaiveDate>,
    #[serde(rename = "days_to_expire")]
    pub days_to_expire: Option<i64>,
}

/// Validated, immutable option listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,
    pub last_price: f64,
    pub volume: u64,
    pub implied_volatility: f64,
    pub option_type: OptionType,
    pub expiration: NaiveDate,
    pub days_to_expire: u32,
}

impl OptionContract {
    /// Validate a provider row.
    ///
    /// `type`, `strike`, `impliedVolatility`, `days_to_expire` and `expiration`
    /// are required (a signal reports its long leg's expiration). Strike and IV
    /// must be positive. Missing quote fields default to zero the way the
    /// provider tables fill gaps.
    pub fn from_row(row: &ChainRow) -> Result<Self, ScanError> {
        let option_type = row
            .option_type
            .ok_or_else(|| ScanError::data("row missing 'type'"))?;
        let strike = row
            .strike
            .ok_or_else(|| ScanError::data("row missing 'strike'"))?;
        let implied_volatility = row
            .implied_volatility
            .ok_or_else(|| ScanError::data("row missing 'impliedVolatility'"))?;
        let days = row
            .days_to_expire
            .ok_or_else(|| ScanError::data("row missing 'days_to_expire'"))?;
        let expiration = row
            .expiration
            .ok_or_else(|| ScanError::data("row missing 'expiration'"))?;

        if !strike.is_finite() || strike <= 0.0 {
            return Err(ScanError::invalid_input(format!("non-positive strike {strike}")));
        }
        if !implied_volatility.is_finite() || implied_volatility <= 0.0 {
            return Err(ScanError::invalid_input(format!(
                "invalid implied volatility {implied_volatility}"
            )));
        }

        let bid = row.bid.filter(|b| b.is_finite()).unwrap_or(0.0).max(0.0);
        let ask = row.ask.filter(|a| a.is_finite()).unwrap_or(0.0).max(bid);
        let last_price = row.last_price.filter(|p| p.is_finite()).unwrap_or(0.0).max(0.0);

        Ok(Self {
            strike,
            bid,
            ask,
            last_price,
            volume: row.volume.unwrap_or(0),
            implied_volatility,
            option_type,
            expiration,
            days_to_expire: u32::try_from(days.max(0)).unwrap_or(u32::MAX),
        })
    }

    /// Mid price from bid/ask
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Bid-ask spread
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    /// Is this option in the money?
    pub fn is_itm(&self, spot: f64) -> bool {
        match self.option_type {
            OptionType::Call => spot > self.strike,
            OptionType::Put => spot < self.strike,
        }
    }
}

/// Option chain for one underlying and one snapshot, in provider order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionChain {
    pub contracts: Vec<OptionContract>,
}

impl OptionChain {
    pub fn new(contracts: Vec<OptionContract>) -> Self {
        Self { contracts }
    }

    /// Build a chain from provider rows, dropping rows that fail validation.
    ///
    /// Returns an error when rows exist but none of them carries the required
    /// fields.
    pub fn from_rows(rows: &[ChainRow]) -> Result<Self, ScanError> {
        let mut contracts = Vec::with_capacity(rows.len());
        let mut last_err = None;

        for row in rows {
            match OptionContract::from_row(row) {
                Ok(contract) => contracts.push(contract),
                Err(e) => {
                    tracing::debug!("Dropping chain row: {}", e);
                    last_err = Some(e);
                }
            }
        }

        match (contracts.is_empty(), last_err) {
            (true, Some(e)) => Err(e),
            _ => Ok(Self { contracts }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Contracts of one type, original order preserved
    pub fn of_type(&self, option_type: OptionType) -> impl Iterator<Item = &OptionContract> {
        self.contracts
            .iter()
            .filter(move |c| c.option_type == option_type)
    }

    /// First contract of the given type listed at `strike`
    pub fn find(&self, option_type: OptionType, strike: f64) -> Option<&OptionContract> {
        self.of_type(option_type)
            .find(|c| (c.strike - strike).abs() < STRIKE_TOLERANCE)
    }

    /// Get call at strike
    pub fn call_at(&self, strike: f64) -> Option<&OptionContract> {
        self.find(OptionType::Call, strike)
    }

    /// Get put at strike
    pub fn put_at(&self, strike: f64) -> Option<&OptionContract> {
        self.find(OptionType::Put, strike)
    }

    /// Mean implied volatility across calls with a usable IV
    pub fn mean_call_iv(&self) -> Option<f64> {
        let ivs: Vec<f64> = self
            .of_type(OptionType::Call)
            .map(|c| c.implied_volatility)
            .filter(|iv| iv.is_finite() && *iv > 0.0)
            .collect();

        if ivs.is_empty() {
            None
        } else {
            Some(ivs.iter().sum::<f64>() / ivs.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(strike: f64, option_type: OptionType) -> ChainRow {
        ChainRow {
            strike: Some(strike),
            bid: Some(1.0),
            ask: Some(1.2),
            last_price: Some(1.1),
            volume: Some(500),
            implied_volatility: Some(0.2),
            option_type: Some(option_type),
            expiration: NaiveDate::from_ymd_opt(2025, 6, 20),
            days_to_expire: Some(30),
        }
    }

    #[test]
    fn test_option_type() {
        assert_eq!(OptionType::Call.phi(), 1.0);
        assert_eq!(OptionType::Put.phi(), -1.0);

        assert_eq!(OptionType::Call.intrinsic(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Put.intrinsic(90.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.intrinsic(90.0, 100.0), 0.0);

        assert_eq!("calls".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!(" PUT ".parse::<OptionType>().unwrap(), OptionType::Put);
        assert!("straddle".parse::<OptionType>().is_err());
    }

    #[test]
    fn test_row_validation() {
        let ok = OptionContract::from_row(&row(100.0, OptionType::Call)).unwrap();
        assert_eq!(ok.days_to_expire, 30);
        assert!((ok.mid() - 1.1).abs() < 1e-12);

        let mut missing_iv = row(100.0, OptionType::Call);
        missing_iv.implied_volatility = None;
        assert!(OptionContract::from_row(&missing_iv).is_err());

        assert!(OptionContract::from_row(&row(0.0, OptionType::Call)).is_err());
        assert!(OptionContract::from_row(&row(-5.0, OptionType::Put)).is_err());

        let mut expired = row(100.0, OptionType::Put);
        expired.days_to_expire = Some(-3);
        assert_eq!(OptionContract::from_row(&expired).unwrap().days_to_expire, 0);

        for iv in [0.0, -0.1, f64::NAN] {
            let mut bad_iv = row(100.0, OptionType::Call);
            bad_iv.implied_volatility = Some(iv);
            assert!(OptionContract::from_row(&bad_iv).is_err(), "iv {iv} accepted");
        }

        let mut far = row(100.0, OptionType::Call);
        far.days_to_expire = Some(i64::MAX);
        assert_eq!(OptionContract::from_row(&far).unwrap().days_to_expire, u32::MAX);

        // The signal carries the long leg's expiration, so rows need one
        let mut undated = row(100.0, OptionType::Call);
        undated.expiration = None;
        assert!(OptionContract::from_row(&undated).is_err());
    }

    #[test]
    fn test_chain_from_rows() {
        let mut broken = row(105.0, OptionType::Call);
        broken.option_type = None;

        let chain = OptionChain::from_rows(&[
            row(100.0, OptionType::Call),
            broken,
            row(100.0, OptionType::Put),
        ])
        .unwrap();

        assert_eq!(chain.len(), 2);
        assert!(chain.call_at(100.0).is_some());
        assert!(chain.call_at(105.0).is_none());
        assert!(chain.put_at(100.004).is_some());
        assert!((chain.mean_call_iv().unwrap() - 0.2).abs() < 1e-12);

        let mut only_broken = row(100.0, OptionType::Call);
        only_broken.days_to_expire = None;
        assert!(OptionChain::from_rows(&[only_broken]).is_err());
        assert!(OptionChain::from_rows(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_row_deserializes_provider_columns() {
        let json = r#"{
            "strike": 410.0, "bid": 2.1, "ask": 2.3, "lastPrice": 2.2,
            "volume": 900, "impliedVolatility": 0.15, "type": "call",
            "expiration": "2025-06-20", "days_to_expire": 30
        }"#;
        let row: ChainRow = serde_json::from_str(json).unwrap();
        let contract = OptionContract::from_row(&row).unwrap();
        assert_eq!(contract.option_type, OptionType::Call);
        assert_eq!(contract.volume, 900);
        assert_eq!(contract.last_price, 2.2);
    }
}
