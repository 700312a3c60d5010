//! Per-currency balance aggregation across all wallet addresses

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{ticker_info, ApiConfig, FailurePolicy};
use crate::providers::{BalanceProvider, BlockCypherProvider, HttpFetch, InsightProvider, ProviderKind};
use crate::wallet::AddressBook;

/// Whole-currency balance per ticker
pub type BalanceMap = BTreeMap<String, f64>;

pub struct BalanceAggregator {
    providers: HashMap<ProviderKind, Arc<dyn BalanceProvider>>,
    policy: FailurePolicy,
}

impl BalanceAggregator {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            providers: HashMap::new(),
            policy,
        }
    }

    /// Aggregator wired to the live BlockCypher and Insight APIs
    pub fn with_defaults(http: Arc<dyn HttpFetch>, config: &ApiConfig, policy: FailurePolicy) -> Self {
        Self::new(policy)
            .register(Arc::new(BlockCypherProvider::new(http.clone(), &config.blockcypher_url)))
            .register(Arc::new(InsightProvider::new(http, &config.insight_url, config.retry)))
    }

    pub fn register(mut self, provider: Arc<dyn BalanceProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    fn provider_for(&self, ticker: &str) -> Option<&Arc<dyn BalanceProvider>> {
        ticker_info(ticker).and_then(|info| self.providers.get(&info.provider))
    }

    /// Sum balances per currency. Addresses are queried one at a time.
    ///
    /// Every ticker in the address book gets an entry. Unsupported tickers and
    /// failed lookups contribute zero, never an error.
    pub async fn aggregate(&self, book: &AddressBook) -> BalanceMap {
        let mut balances = BalanceMap::new();

        for ticker in book.tickers() {
            let addresses = book.addresses(ticker);
            let Some(provider) = self.provider_for(ticker) else {
                warn!("{} is not supported, skipping {} address(es)", ticker, addresses.len());
                balances.insert(ticker.to_string(), 0.0);
                continue;
            };

            let mut total = 0.0;
            for address in addresses {
                match provider.fetch_balance(ticker, address).await {
                    Ok(amount) => {
                        info!("{} {}: {:.8}", ticker, address, amount);
                        total += amount;
                    }
                    Err(e) => {
                        error!("Failed to fetch {} balance for {}: {}", ticker, address, e);
                        if self.policy == FailurePolicy::ResetCurrency {
                            total = 0.0;
                        }
                    }
                }
            }

            info!("{} total: {:.8} via {}", ticker, total, provider.kind());
            balances.insert(ticker.to_string(), total);
        }

        balances
    }
}
