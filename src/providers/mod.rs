pub mod blockcypher;
pub mod http;
pub mod insight;

pub use blockcypher::BlockCypherProvider;
pub use http::{endpoint_url, HttpFetch, ReqwestFetcher};
pub use insight::InsightProvider;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Number;

use crate::error::Result;

/// Enum representing supported balance APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    BlockCypher,
    Insight,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::BlockCypher => write!(f, "BlockCypher"),
            ProviderKind::Insight => write!(f, "Insight"),
        }
    }
}

/// Trait for balance APIs to implement
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Balance of one address in whole-currency units
    async fn fetch_balance(&self, ticker: &str, address: &str) -> Result<f64>;

    fn kind(&self) -> ProviderKind;
}

/// Convert a smallest-unit amount (satoshi, wei) to whole-currency units
///
/// Integers go through `Decimal` so the division is exact before the final
/// conversion to f64. Values too large for that (big wei balances that serde
/// already turned into floats) fall back to float division. Negative amounts
/// are not balances and yield `None`.
pub fn to_whole_units(raw: &Number, decimals: u32) -> Option<f64> {
    if let Some(v) = raw.as_u64() {
        return Decimal::try_from_i128_with_scale(i128::from(v), decimals)
            .ok()
            .and_then(|d| d.to_f64());
    }

    raw.as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v / 10_f64.powi(decimals as i32))
}
