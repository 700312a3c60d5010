//! Error types for wallet valuation

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while valuing a wallet.
///
/// `Config` and `WalletFile` are fatal and abort the run. The network variants
/// are recovered where they happen and only ever end up in a log line.
#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cannot read wallet file {path:?}: {source}")]
    WalletFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is rate limiting us, gave up after {attempts} attempt(s)")]
    RateLimited { url: String, attempts: u32 },

    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("No balance provider for {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, ValuationError>;
