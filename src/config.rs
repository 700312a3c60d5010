//! Wallet valuation configuration

use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use tracing::Level;

use crate::error::{Result, ValuationError};
use crate::providers::ProviderKind;

// Defaults
pub const DEFAULT_WALLET_FILE: &str = "./wallet.properties";
pub const DEFAULT_FIAT: &str = "EUR";

// Upstream APIs
pub const PRICE_API: &str = "https://min-api.cryptocompare.com";
pub const PRICE_MULTI_ENDPOINT: &str = "/data/pricemulti";
pub const BLOCKCYPHER_API: &str = "https://api.blockcypher.com/v1";
pub const INSIGHT_API: &str = "https://bch-insight.bitpay.com/api";

// Rate limit handling for the Insight explorer
pub const RETRY_ATTEMPTS: u32 = 2;
pub const RETRY_BACKOFF_MS: u64 = 1000;

/// A currency we know how to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerInfo {
    pub ticker: &'static str,
    pub provider: ProviderKind,
    /// Decimals of the smallest unit (8 for satoshi, 18 for wei)
    pub decimals: u32,
}

pub static SUPPORTED_TICKERS: [TickerInfo; 4] = [
    TickerInfo { ticker: "BTC", provider: ProviderKind::BlockCypher, decimals: 8 },
    TickerInfo { ticker: "LTC", provider: ProviderKind::BlockCypher, decimals: 8 },
    TickerInfo { ticker: "ETH", provider: ProviderKind::BlockCypher, decimals: 18 },
    TickerInfo { ticker: "BCH", provider: ProviderKind::Insight, decimals: 8 },
];

/// Look up the provider and unit scale for a ticker
pub fn ticker_info(ticker: &str) -> Option<&'static TickerInfo> {
    SUPPORTED_TICKERS
        .iter()
        .find(|info| info.ticker.eq_ignore_ascii_case(ticker))
}

/// Verbosity accepted by `--log`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warning => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            _ => Err(ValuationError::Config(format!(
                "Invalid log level: {}. Valid options: ERROR, WARNING, INFO, DEBUG",
                s
            ))),
        }
    }
}

/// What the aggregator does with a currency when one of its addresses fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FailurePolicy {
    /// Drop only the failing address and keep the partial sum
    #[default]
    #[value(name = "skip")]
    SkipAddress,
    /// Discard everything accumulated so far for the currency
    #[value(name = "reset")]
    ResetCurrency,
}

/// Bounded retry with a fixed pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_ATTEMPTS,
            backoff: Duration::from_millis(RETRY_BACKOFF_MS),
        }
    }
}

/// Endpoints and retry settings, overridable from the environment
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub price_url: String,
    pub blockcypher_url: String,
    pub insight_url: String,
    pub retry: RetryPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            price_url: PRICE_API.to_string(),
            blockcypher_url: BLOCKCYPHER_API.to_string(),
            insight_url: INSIGHT_API.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ApiConfig {
    /// Create configuration from environment variables (a `.env` file is
    /// loaded by `main` beforehand)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
                .trim()
                .trim_end_matches('/')
                .to_string()
        };

        let max_attempts = match lookup("BALANCE_RETRY_ATTEMPTS") {
            Some(raw) => parse_number::<u32>("BALANCE_RETRY_ATTEMPTS", &raw)?,
            None => RETRY_ATTEMPTS,
        };
        if max_attempts == 0 {
            return Err(ValuationError::Config(
                "BALANCE_RETRY_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let backoff_ms = match lookup("BALANCE_RETRY_BACKOFF_MS") {
            Some(raw) => parse_number::<u64>("BALANCE_RETRY_BACKOFF_MS", &raw)?,
            None => RETRY_BACKOFF_MS,
        };

        Ok(Self {
            price_url: url("PRICE_API_URL", PRICE_API),
            blockcypher_url: url("BLOCKCYPHER_API_URL", BLOCKCYPHER_API),
            insight_url: url("INSIGHT_API_URL", INSIGHT_API),
            retry: RetryPolicy {
                max_attempts,
                backoff: Duration::from_millis(backoff_ms),
            },
        })
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ValuationError::Config(format!("{} must be a number, got {:?}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("ERROR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("Info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::Warning.as_tracing_level(), Level::WARN);
    }

    #[test]
    fn test_invalid_log_level_is_config_error() {
        match "VERBOSE".parse::<LogLevel>() {
            Err(ValuationError::Config(msg)) => assert!(msg.contains("VERBOSE")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_ticker_table() {
        let eth = ticker_info("eth").unwrap();
        assert_eq!(eth.provider, ProviderKind::BlockCypher);
        assert_eq!(eth.decimals, 18);

        let bch = ticker_info("BCH").unwrap();
        assert_eq!(bch.provider, ProviderKind::Insight);
        assert_eq!(bch.decimals, 8);

        assert!(ticker_info("DOGE").is_none());
    }

    #[test]
    fn test_api_config_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.price_url, PRICE_API);
        assert_eq!(config.blockcypher_url, BLOCKCYPHER_API);
        assert_eq!(config.insight_url, INSIGHT_API);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_api_config_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("PRICE_API_URL", "http://localhost:9000/"),
            ("BALANCE_RETRY_ATTEMPTS", "5"),
            ("BALANCE_RETRY_BACKOFF_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.price_url, "http://localhost:9000");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff, Duration::from_millis(250));
    }

    #[test]
    fn test_api_config_rejects_bad_numbers() {
        assert!(matches!(
            ApiConfig::from_lookup(lookup(&[("BALANCE_RETRY_ATTEMPTS", "two")])),
            Err(ValuationError::Config(_))
        ));
        assert!(matches!(
            ApiConfig::from_lookup(lookup(&[("BALANCE_RETRY_ATTEMPTS", "0")])),
            Err(ValuationError::Config(_))
        ));
    }
}
