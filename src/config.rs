//! Scanner configuration
//!
//! Three layers, later ones winning: built-in defaults, a YAML file, then
//! environment variables. Each layer is a [`ConfigLayer`] whose fields are all
//! optional; [`ScannerConfig::resolve`] folds them over the defaults and
//! validates the result.
//!
//! ```yaml
//! watchlist: [NVDA, AMD, QQQ]
//! strategy:
//!   min_probability: 60
//!   drift: { model: risk_neutral, rate: 0.05 }
//! notification:
//!   queue_capacity: 64
//!   overflow: drop_oldest
//! scan:
//!   interval_secs: 60
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::core::{ScanError, ScanResult};
use crate::models::DriftModel;
use crate::notify::{OverflowPolicy, DEFAULT_QUEUE_CAPACITY};
use crate::strategy::StrategyConfig;

pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;

/// Tickers scanned when none are configured
pub const DEFAULT_WATCHLIST: &[&str] = &["NVDA", "TSLA", "AAPL", "AMD", "QQQ", "SPY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            telegram_chat_id: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowPolicy::default(),
        }
    }
}

impl NotificationConfig {
    /// Token and chat id, when both are set
    pub fn telegram_credentials(&self) -> Option<(&str, &str)> {
        match (&self.telegram_token, &self.telegram_chat_id) {
            (Some(t), Some(c)) if !t.is_empty() && !c.is_empty() => Some((t, c)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSchedule {
    pub interval_secs: u64,
}

impl Default for ScanSchedule {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub watchlist: Vec<String>,
    pub strategy: StrategyConfig,
    pub notification: NotificationConfig,
    pub scan: ScanSchedule,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            watchlist: DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
            strategy: StrategyConfig::default(),
            notification: NotificationConfig::default(),
            scan: ScanSchedule::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyLayer {
    pub iv_percentile_threshold: Option<f64>,
    pub min_volume: Option<u64>,
    pub max_spread_ratio: Option<f64>,
    pub max_vega: Option<f64>,
    pub min_probability: Option<f64>,
    pub long_delta: Option<f64>,
    pub short_delta: Option<f64>,
    pub greeks_rate: Option<f64>,
    pub drift: Option<DriftModel>,
    pub hv_window: Option<usize>,
    pub require_liquidity: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationLayer {
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub queue_capacity: Option<usize>,
    pub overflow: Option<OverflowPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanLayer {
    pub interval_secs: Option<u64>,
}

/// One partial source of configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub watchlist: Option<Vec<String>>,
    pub strategy: StrategyLayer,
    pub notification: NotificationLayer,
    pub scan: ScanLayer,
}

macro_rules! overlay {
    ($target:expr, $layer:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $layer.$field {
                $target.$field = v;
            }
        )+
    };
}

impl ConfigLayer {
    pub fn from_yaml_str(yaml: &str) -> ScanResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ScanError::config(format!("invalid YAML: {e}")))
    }

    /// Missing file is an empty layer, not an error
    pub fn from_file(path: &Path) -> ScanResult<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| ScanError::config(format!("unable to read {}: {e}", path.display())))?;
        Self::from_yaml_str(&contents)
            .map_err(|e| ScanError::config(format!("{}: {e}", path.display())))
    }

    /// Layer from `SPREAD_*`, `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`
    pub fn from_env_map(env: &HashMap<String, String>) -> ScanResult<Self> {
        let drift = match env_value(env, "SPREAD_DRIFT") {
            None => None,
            Some(model) => Some(parse_drift(model, parse_env(env, "SPREAD_RISK_FREE_RATE")?)?),
        };

        Ok(Self {
            watchlist: env_value(env, "SPREAD_WATCHLIST").map(parse_watchlist),
            strategy: StrategyLayer {
                iv_percentile_threshold: parse_env(env, "SPREAD_IV_PERCENTILE_THRESHOLD")?,
                min_volume: parse_env(env, "SPREAD_MIN_VOLUME")?,
                max_spread_ratio: parse_env(env, "SPREAD_MAX_SPREAD_RATIO")?,
                max_vega: parse_env(env, "SPREAD_MAX_VEGA")?,
                min_probability: parse_env(env, "SPREAD_MIN_PROBABILITY")?,
                long_delta: parse_env(env, "SPREAD_LONG_DELTA")?,
                short_delta: parse_env(env, "SPREAD_SHORT_DELTA")?,
                greeks_rate: parse_env(env, "SPREAD_GREEKS_RATE")?,
                drift,
                hv_window: parse_env(env, "SPREAD_HV_WINDOW")?,
                require_liquidity: parse_env(env, "SPREAD_REQUIRE_LIQUIDITY")?,
            },
            notification: NotificationLayer {
                telegram_token: env_value(env, "TELEGRAM_BOT_TOKEN").map(str::to_string),
                telegram_chat_id: env_value(env, "TELEGRAM_CHAT_ID").map(str::to_string),
                queue_capacity: parse_env(env, "SPREAD_QUEUE_CAPACITY")?,
                overflow: parse_env(env, "SPREAD_QUEUE_OVERFLOW")?,
            },
            scan: ScanLayer {
                interval_secs: parse_env(env, "SPREAD_SCAN_INTERVAL_SECS")?,
            },
        })
    }

    pub fn from_process_env() -> ScanResult<Self> {
        Self::from_env_map(&std::env::vars().collect())
    }

    fn apply(self, config: &mut ScannerConfig) {
        if let Some(watchlist) = self.watchlist {
            config.watchlist = watchlist;
        }

        let s = self.strategy;
        overlay!(config.strategy, s;
            iv_percentile_threshold, min_volume, max_spread_ratio, max_vega,
            min_probability, long_delta, short_delta, greeks_rate, drift,
            hv_window, require_liquidity,
        );

        let n = self.notification;
        if n.telegram_token.is_some() {
            config.notification.telegram_token = n.telegram_token;
        }
        if n.telegram_chat_id.is_some() {
            config.notification.telegram_chat_id = n.telegram_chat_id;
        }
        overlay!(config.notification, n; queue_capacity, overflow);

        overlay!(config.scan, self.scan; interval_secs);
    }
}

impl ScannerConfig {
    /// Defaults overlaid with `file`, then `env`, then validated
    pub fn resolve(file: ConfigLayer, env: ConfigLayer) -> ScanResult<Self> {
        let mut config = Self::default();
        file.apply(&mut config);
        env.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Resolve from a YAML file (optional) and the process environment
    pub fn load(path: &Path) -> ScanResult<Self> {
        let config = Self::resolve(ConfigLayer::from_file(path)?, ConfigLayer::from_process_env()?)?;
        tracing::debug!(
            watchlist = ?config.watchlist,
            interval_secs = config.scan.interval_secs,
            "Configuration resolved"
        );
        Ok(config)
    }

    pub fn validate(&self) -> ScanResult<()> {
        self.strategy.validate().map_err(ScanError::config)?;

        if self.watchlist.iter().any(|t| t.trim().is_empty()) {
            return Err(ScanError::config("watchlist contains an empty ticker"));
        }
        if self.notification.queue_capacity == 0 {
            return Err(ScanError::config("queue_capacity must be greater than zero"));
        }
        if self.scan.interval_secs == 0 {
            return Err(ScanError::config("interval_secs must be greater than zero"));
        }
        Ok(())
    }
}

fn env_value<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_env<T>(env: &HashMap<String, String>, key: &str) -> ScanResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_value(env, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ScanError::config(format!("{key}={raw}: {e}")))
        })
        .transpose()
}

fn parse_watchlist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_drift(model: &str, rate: Option<f64>) -> ScanResult<DriftModel> {
    match model.to_ascii_lowercase().replace('-', "_").as_str() {
        "risk_neutral" => Ok(match rate {
            Some(rate) => DriftModel::RiskNeutral { rate },
            None => DriftModel::default(),
        }),
        "historical" => Ok(DriftModel::Historical),
        other => Err(ScanError::config(format!("unknown drift model '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_resolve() {
        let config = ScannerConfig::resolve(ConfigLayer::default(), ConfigLayer::default()).unwrap();
        assert_eq!(config, ScannerConfig::default());
        assert_eq!(config.scan.interval_secs, 60);
        assert_eq!(config.notification.queue_capacity, 64);
        assert!(config.notification.telegram_credentials().is_none());
    }

    #[test]
    fn test_yaml_layer() {
        let yaml = r#"
watchlist: [NVDA, AMD]
strategy:
  min_probability: 55
  drift: { model: historical }
notification:
  overflow: block
scan:
  interval_secs: 300
"#;
        let file = ConfigLayer::from_yaml_str(yaml).unwrap();
        let config = ScannerConfig::resolve(file, ConfigLayer::default()).unwrap();

        assert_eq!(config.watchlist, vec!["NVDA", "AMD"]);
        assert_eq!(config.strategy.min_probability, 55.0);
        assert_eq!(config.strategy.drift, DriftModel::Historical);
        // Untouched fields keep defaults
        assert_eq!(config.strategy.long_delta, 0.3);
        assert_eq!(config.notification.overflow, OverflowPolicy::Block);
        assert_eq!(config.scan.interval_secs, 300);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = ConfigLayer::from_yaml_str("strategy:\n  min_probability: 55\n  max_vega: 2.0\n").unwrap();
        let env = ConfigLayer::from_env_map(&env(&[
            ("SPREAD_MIN_PROBABILITY", "70"),
            ("SPREAD_WATCHLIST", "nvda, qqq ,"),
            ("SPREAD_DRIFT", "risk-neutral"),
            ("SPREAD_RISK_FREE_RATE", "0.03"),
            ("TELEGRAM_BOT_TOKEN", "42:abc"),
            ("TELEGRAM_CHAT_ID", "1001"),
            ("UNRELATED", "x"),
        ]))
        .unwrap();

        let config = ScannerConfig::resolve(file, env).unwrap();
        assert_eq!(config.strategy.min_probability, 70.0);
        assert_eq!(config.strategy.max_vega, 2.0);
        assert_eq!(config.watchlist, vec!["NVDA", "QQQ"]);
        assert_eq!(config.strategy.drift, DriftModel::RiskNeutral { rate: 0.03 });
        assert_eq!(config.notification.telegram_credentials(), Some(("42:abc", "1001")));
    }

    #[test]
    fn test_bad_env_value_is_config_error() {
        let err = ConfigLayer::from_env_map(&env(&[("SPREAD_MIN_VOLUME", "lots")])).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
        assert!(err.to_string().contains("SPREAD_MIN_VOLUME"));

        assert!(ConfigLayer::from_env_map(&env(&[("SPREAD_DRIFT", "momentum")])).is_err());
        // Blank values are ignored
        assert_eq!(
            ConfigLayer::from_env_map(&env(&[("SPREAD_MAX_VEGA", "  ")])).unwrap(),
            ConfigLayer::default()
        );
    }

    #[test]
    fn test_validation() {
        let env = ConfigLayer::from_env_map(&env(&[("SPREAD_MIN_PROBABILITY", "150")])).unwrap();
        assert!(ScannerConfig::resolve(ConfigLayer::default(), env).is_err());

        let zero_interval = ConfigLayer::from_yaml_str("scan:\n  interval_secs: 0\n").unwrap();
        assert!(ScannerConfig::resolve(zero_interval, ConfigLayer::default()).is_err());

        assert!(ConfigLayer::from_yaml_str("strategy:\n  bogus: 1\n").is_err());
    }

    #[test]
    fn test_file_layer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "watchlist: [TSLA]").unwrap();
        let layer = ConfigLayer::from_file(file.path()).unwrap();
        assert_eq!(layer.watchlist, Some(vec!["TSLA".to_string()]));

        let missing = ConfigLayer::from_file(Path::new("/nonexistent/config.yaml")).unwrap();
        assert_eq!(missing, ConfigLayer::default());
    }
}
