//! Fiat exchange rates from the CryptoCompare multi-symbol price API

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::PRICE_MULTI_ENDPOINT;
use crate::error::{Result, ValuationError};
use crate::providers::http::parse_base;
use crate::providers::HttpFetch;

/// Fiat rate per ticker, 0.0 when unknown
pub type RateMap = BTreeMap<String, f64>;

pub struct PriceFetcher {
    http: Arc<dyn HttpFetch>,
    base_url: String,
    fiat: String,
}

impl PriceFetcher {
    pub fn new(http: Arc<dyn HttpFetch>, base_url: &str, fiat: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            fiat: fiat.to_uppercase(),
        }
    }

    pub fn fiat(&self) -> &str {
        &self.fiat
    }

    fn price_url(&self, tickers: &[String]) -> Result<String> {
        let mut url = parse_base(&format!("{}{}", self.base_url, PRICE_MULTI_ENDPOINT))?;
        url.query_pairs_mut()
            .append_pair("fsyms", &tickers.join(","))
            .append_pair("tsyms", &self.fiat);
        Ok(url.to_string())
    }

    /// Fetch rates for all tickers in one request
    ///
    /// The result always has an entry for every requested ticker. Any failure
    /// is logged and leaves the affected rates at zero.
    pub async fn fetch_rates<I, S>(&self, tickers: I) -> RateMap
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tickers: Vec<String> = tickers
            .into_iter()
            .map(|t| t.as_ref().to_uppercase())
            .collect();
        tickers.sort();
        tickers.dedup();

        let mut rates: RateMap = tickers.iter().map(|t| (t.clone(), 0.0)).collect();
        if tickers.is_empty() {
            return rates;
        }

        match self.request(&tickers).await {
            Ok(body) => {
                for (ticker, rate) in rates.iter_mut() {
                    match body
                        .get(ticker)
                        .and_then(|quotes| quotes.get(&self.fiat))
                        .and_then(Value::as_f64)
                    {
                        Some(found) => *rate = found,
                        None => warn!("No {} rate for {}, using 0", self.fiat, ticker),
                    }
                }
            }
            Err(e) => error!("Failed to fetch {} rates: {}", self.fiat, e),
        }

        rates
    }

    async fn request(&self, tickers: &[String]) -> Result<Value> {
        let url = self.price_url(tickers)?;
        debug!("Price API URL: {}", url);

        let response = self.http.get(&url).await?;
        if !response.is_success() {
            return Err(ValuationError::Status {
                url,
                status: response.status,
            });
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|e| ValuationError::Decode {
            url: url.clone(),
            reason: format!("{}. Body: {}", e, response.body),
        })?;

        // CryptoCompare reports errors in-band with a 200
        if body.get("Response").and_then(Value::as_str) == Some("Error") {
            let message = body
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or("no message")
                .to_string();
            return Err(ValuationError::Decode { url, reason: message });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedFetcher;

    const BASE: &str = "https://min-api.cryptocompare.com";

    #[tokio::test]
    async fn test_missing_ticker_defaults_to_zero() {
        let http = Arc::new(ScriptedFetcher::new().respond(200, r#"{"BTC":{"EUR":50000}}"#));
        let fetcher = PriceFetcher::new(http.clone(), BASE, "EUR");

        let rates = fetcher.fetch_rates(["BTC", "ETH"]).await;

        assert_eq!(rates.len(), 2);
        assert_eq!(rates["BTC"], 50000.0);
        assert_eq!(rates["ETH"], 0.0);
        assert_eq!(
            http.requests.lock().as_slice(),
            ["https://min-api.cryptocompare.com/data/pricemulti?fsyms=BTC%2CETH&tsyms=EUR"]
        );
    }

    #[tokio::test]
    async fn test_single_batched_request() {
        let http = Arc::new(ScriptedFetcher::new().respond(
            200,
            r#"{"BTC":{"EUR":50000.5},"ETH":{"EUR":2500.25},"LTC":{"EUR":80}}"#,
        ));
        let fetcher = PriceFetcher::new(http.clone(), BASE, "EUR");

        let rates = fetcher.fetch_rates(vec!["BTC".to_string(), "ETH".to_string(), "LTC".to_string()]).await;

        assert_eq!(http.request_count(), 1);
        assert_eq!(rates["BTC"], 50000.5);
        assert_eq!(rates["ETH"], 2500.25);
        assert_eq!(rates["LTC"], 80.0);
    }

    #[tokio::test]
    async fn test_http_error_gives_all_zero() {
        let http = Arc::new(ScriptedFetcher::new().respond(500, "Internal Server Error"));
        let fetcher = PriceFetcher::new(http, BASE, "EUR");

        let rates = fetcher.fetch_rates(["BTC", "BCH"]).await;

        assert_eq!(rates.len(), 2);
        assert!(rates.values().all(|r| *r == 0.0));
    }

    #[tokio::test]
    async fn test_transport_error_gives_all_zero() {
        let http = Arc::new(ScriptedFetcher::new().fail(BASE));
        let fetcher = PriceFetcher::new(http, BASE, "EUR");

        let rates = fetcher.fetch_rates(["ETH"]).await;
        assert_eq!(rates["ETH"], 0.0);
    }

    #[tokio::test]
    async fn test_in_band_error_gives_all_zero() {
        let http = Arc::new(ScriptedFetcher::new().respond(
            200,
            r#"{"Response":"Error","Message":"fsyms param is invalid"}"#,
        ));
        let fetcher = PriceFetcher::new(http, BASE, "EUR");

        let rates = fetcher.fetch_rates(["BTC"]).await;
        assert_eq!(rates["BTC"], 0.0);
    }

    #[tokio::test]
    async fn test_other_fiat_is_requested_and_read() {
        let http = Arc::new(ScriptedFetcher::new().respond(200, r#"{"BTC":{"EUR":1,"USD":60000}}"#));
        let fetcher = PriceFetcher::new(http.clone(), BASE, "usd");

        let rates = fetcher.fetch_rates(["btc"]).await;

        assert_eq!(fetcher.fiat(), "USD");
        assert_eq!(rates["BTC"], 60000.0);
        assert!(http.requests.lock()[0].ends_with("fsyms=BTC&tsyms=USD"));
    }

    #[tokio::test]
    async fn test_query_values_are_form_encoded() {
        let http = Arc::new(ScriptedFetcher::new().respond(200, r#"{}"#));
        let fetcher = PriceFetcher::new(http.clone(), BASE, "EUR&x=1");

        let rates = fetcher.fetch_rates(["BTC"]).await;

        assert_eq!(rates["BTC"], 0.0);
        assert_eq!(
            http.requests.lock()[0],
            "https://min-api.cryptocompare.com/data/pricemulti?fsyms=BTC&tsyms=EUR%26X%3D1"
        );
    }

    #[tokio::test]
    async fn test_no_tickers_makes_no_request() {
        let http = Arc::new(ScriptedFetcher::new());
        let fetcher = PriceFetcher::new(http.clone(), BASE, "EUR");

        let rates = fetcher.fetch_rates(Vec::<String>::new()).await;

        assert!(rates.is_empty());
        assert_eq!(http.request_count(), 0);
    }
}
