use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

mod aggregator;
mod config;
mod display;
mod error;
mod price;
mod providers;
mod wallet;

use aggregator::BalanceAggregator;
use config::{ApiConfig, FailurePolicy, LogLevel, DEFAULT_FIAT, DEFAULT_WALLET_FILE};
use display::{print_valuation, Valuation};
use price::PriceFetcher;
use providers::{HttpFetch, ReqwestFetcher};
use wallet::AddressBook;

#[derive(Parser)]
#[command(name = "wallet-valuation")]
#[command(about = "Value the addresses of a wallet file in fiat", long_about = None)]
struct Cli {
    /// Wallet file with one TICKER=ADDRESS per line
    #[arg(long, default_value = DEFAULT_WALLET_FILE)]
    wallets: PathBuf,

    /// Log level: ERROR, WARNING, INFO, DEBUG
    #[arg(long, default_value = "ERROR")]
    log: String,

    /// Fiat currency to value balances in
    #[arg(long, default_value = DEFAULT_FIAT)]
    fiat: String,

    /// What to do with a currency when one of its addresses fails
    #[arg(long, value_enum, default_value_t = FailurePolicy::SkipAddress)]
    on_failure: FailurePolicy,
}

fn init_logging(level: LogLevel) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level.as_tracing_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(cli: Cli, config: ApiConfig) -> Result<()> {
    let book = AddressBook::load(&cli.wallets)?;
    if book.is_empty() {
        warn!("No addresses found in {}", cli.wallets.display());
    } else {
        info!(
            "Valuing {} address(es) across {} currencies: {}",
            book.address_count(),
            book.len(),
            book.tickers().collect::<Vec<_>>().join(", ")
        );
    }

    let http: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new());

    let aggregator = BalanceAggregator::with_defaults(http.clone(), &config, cli.on_failure);
    let balances = aggregator.aggregate(&book).await;

    let prices = PriceFetcher::new(http, &config.price_url, &cli.fiat);
    let rates = prices.fetch_rates(balances.keys()).await;

    let valuation = Valuation::compute(&balances, &rates, prices.fiat());
    print_valuation(&valuation);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Configuration problems abort before any request goes out
    let level: LogLevel = cli.log.parse()?;
    init_logging(level)?;
    let config = ApiConfig::from_env()?;

    run(cli, config).await
}
