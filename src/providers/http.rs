//! Minimal HTTP GET seam shared by the balance and price clients

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::error::{Result, ValuationError};

/// Parse an API base URL, mapping failures to a configuration error
pub fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| ValuationError::Config(format!("Invalid API URL {:?}: {}", base, e)))
}

/// Append path segments to `base`, percent-encoding each one
pub fn endpoint_url(base: &str, segments: &[&str]) -> Result<String> {
    let mut url = parse_base(base)?;
    url.path_segments_mut()
        .map_err(|_| ValuationError::Config(format!("API URL {:?} cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}

/// Status and raw body of a completed request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Issue a GET. Only transport failures are errors, any status is returned.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| ValuationError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|source| ValuationError::Http {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!("{} status: {}, body: {}", url, status, body);

        Ok(HttpResponse { status, body })
    }
}
