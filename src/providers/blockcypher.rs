//! BlockCypher address API client (BTC, LTC, ETH)

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Number;

use super::{endpoint_url, to_whole_units, BalanceProvider, HttpFetch, ProviderKind};
use crate::config::ticker_info;
use crate::error::{Result, ValuationError};

#[derive(Debug, Deserialize)]
struct AddressResponse {
    final_balance: Number,
}

pub struct BlockCypherProvider {
    http: Arc<dyn HttpFetch>,
    base_url: String,
}

impl BlockCypherProvider {
    pub fn new(http: Arc<dyn HttpFetch>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn address_url(&self, ticker: &str, address: &str) -> Result<String> {
        let chain = ticker.to_lowercase();
        endpoint_url(&self.base_url, &[chain.as_str(), "main", "addrs", address])
    }
}

#[async_trait]
impl BalanceProvider for BlockCypherProvider {
    async fn fetch_balance(&self, ticker: &str, address: &str) -> Result<f64> {
        let info = ticker_info(ticker)
            .filter(|info| info.provider == ProviderKind::BlockCypher)
            .ok_or_else(|| ValuationError::Unsupported(ticker.to_string()))?;

        let url = self.address_url(ticker, address)?;
        let response = self.http.get(&url).await?;

        if !response.is_success() {
            return Err(ValuationError::Status {
                url,
                status: response.status,
            });
        }

        let parsed: AddressResponse =
            serde_json::from_str(&response.body).map_err(|e| ValuationError::Decode {
                url: url.clone(),
                reason: format!("{}. Body: {}", e, response.body),
            })?;

        to_whole_units(&parsed.final_balance, info.decimals).ok_or_else(|| ValuationError::Decode {
            url,
            reason: format!("final_balance {} is not a valid balance", parsed.final_balance),
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::BlockCypher
    }
}
