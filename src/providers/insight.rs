//! Insight explorer client (BCH)
//!
//! The balance endpoint answers with a bare integer in satoshis. When it is
//! throttling it answers with HTTP 429 or with a `{"status": ...}` object, in
//! which case we back off and try again according to the [`RetryPolicy`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{endpoint_url, to_whole_units, BalanceProvider, HttpFetch, ProviderKind};
use crate::config::{ticker_info, RetryPolicy};
use crate::error::{Result, ValuationError};

const TOO_MANY_REQUESTS: u16 = 429;

/// Outcome of a single attempt
enum Attempt {
    Balance(f64),
    RateLimited,
}

pub struct InsightProvider {
    http: Arc<dyn HttpFetch>,
    base_url: String,
    retry: RetryPolicy,
}

impl InsightProvider {
    pub fn new(http: Arc<dyn HttpFetch>, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    fn balance_url(&self, address: &str) -> Result<String> {
        endpoint_url(&self.base_url, &["addr", address, "balance"])
    }

    async fn attempt(&self, url: &str, decimals: u32) -> Result<Attempt> {
        let response = self.http.get(url).await?;

        if response.status == TOO_MANY_REQUESTS {
            return Ok(Attempt::RateLimited);
        }
        if !response.is_success() {
            return Err(ValuationError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        let value: Value = serde_json::from_str(response.body.trim()).map_err(|e| ValuationError::Decode {
            url: url.to_string(),
            reason: format!("{}. Body: {}", e, response.body),
        })?;

        match value {
            Value::Number(raw) => to_whole_units(&raw, decimals)
                .map(Attempt::Balance)
                .ok_or_else(|| ValuationError::Decode {
                    url: url.to_string(),
                    reason: format!("balance {} is not a valid balance", raw),
                }),
            Value::Object(ref obj) if obj.contains_key("status") => {
                debug!("{} answered with status object: {}", url, value);
                Ok(Attempt::RateLimited)
            }
            other => Err(ValuationError::Decode {
                url: url.to_string(),
                reason: format!("expected an integer balance, got {}", other),
            }),
        }
    }
}

#[async_trait]
impl BalanceProvider for InsightProvider {
    async fn fetch_balance(&self, ticker: &str, address: &str) -> Result<f64> {
        let info = ticker_info(ticker)
            .filter(|info| info.provider == ProviderKind::Insight)
            .ok_or_else(|| ValuationError::Unsupported(ticker.to_string()))?;

        let url = self.balance_url(address)?;
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.attempt(&url, info.decimals).await? {
                Attempt::Balance(balance) => return Ok(balance),
                Attempt::RateLimited if attempt < max_attempts => {
                    warn!(
                        "{} rate limited (attempt {}/{}), retrying in {:?}",
                        url, attempt, max_attempts, self.retry.backoff
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Attempt::RateLimited => {}
            }
        }

        Err(ValuationError::RateLimited {
            url,
            attempts: max_attempts,
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Insight
    }
}
