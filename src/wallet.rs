//! Wallet file loading
//!
//! A wallet file is a list of `TICKER=ADDRESS` lines. Lines starting with `#`
//! are comments, lines without `=` are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, ValuationError};

const SEPARATOR: char = '=';
const COMMENT: char = '#';

/// Addresses to look up, grouped by ticker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBook {
    entries: BTreeMap<String, Vec<String>>,
}

impl AddressBook {
    /// Parse wallet file contents
    pub fn parse(contents: &str) -> Self {
        let mut entries: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();

            if line.starts_with(COMMENT) {
                continue;
            }

            let Some((ticker, address)) = line.split_once(SEPARATOR) else {
                if !line.is_empty() {
                    debug!("Skipping malformed wallet line {}: {:?}", line_no + 1, line);
                }
                continue;
            };

            let ticker = ticker.trim().to_uppercase();
            let address = address.trim();
            if ticker.is_empty() || address.is_empty() {
                debug!("Skipping incomplete wallet line {}: {:?}", line_no + 1, line);
                continue;
            }

            entries.entry(ticker).or_default().push(address.to_string());
        }

        Self { entries }
    }

    /// Read and parse a wallet file. A missing or unreadable file is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ValuationError::WalletFile {
            path: path.to_path_buf(),
            source,
        })?;

        let book = Self::parse(&contents);
        debug!(
            "Loaded {} address(es) for {} currencies from {}",
            book.address_count(),
            book.len(),
            path.display()
        );
        Ok(book)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn addresses(&self, ticker: &str) -> &[String] {
        self.entries.get(ticker).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn address_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_groups_by_ticker() {
        let book = AddressBook::parse(
            "BTC=1BoatSLRHtKNngkdXEeobR76b53LETtpyT\n\
             ETH=0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe\n\
             BTC=3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy\n",
        );

        assert_eq!(book.len(), 2);
        assert_eq!(
            book.addresses("BTC"),
            ["1BoatSLRHtKNngkdXEeobR76b53LETtpyT", "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"]
        );
        assert_eq!(book.addresses("ETH").len(), 1);
        assert_eq!(book.tickers().collect::<Vec<_>>(), ["BTC", "ETH"]);
    }

    #[test]
    fn test_comments_and_malformed_lines_are_skipped() {
        let book = AddressBook::parse("# comment\njusttext\n\n   \nLTC=LaddrOne\n# BTC=ignored\n");

        assert_eq!(book.len(), 1);
        assert_eq!(book.addresses("LTC"), ["LaddrOne"]);
        assert!(book.addresses("BTC").is_empty());
        assert!(book.tickers().all(|t| t != "# comment" && t != "justtext"));
    }

    #[test]
    fn test_split_on_first_separator_only() {
        let book = AddressBook::parse("bch = qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a=x \n");
        assert_eq!(book.addresses("BCH"), ["qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a=x"]);
    }

    #[test]
    fn test_empty_parts_are_skipped() {
        let book = AddressBook::parse("=addr\nBTC=\n");
        assert!(book.is_empty());
    }

    #[test]
    fn test_no_valid_lines_gives_empty_book() {
        let book = AddressBook::parse("# only comments\nnothing here\n");
        assert!(book.is_empty());
        assert_eq!(book.address_count(), 0);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("wallet-valuation-{}.properties", std::process::id()));
        std::fs::write(&path, "# test wallet\nBTC=addr1\nBTC=addr2\n").unwrap();

        let book = AddressBook::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(book.address_count(), 2);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = AddressBook::load("/definitely/not/here/wallet.properties");
        match result {
            Err(ValuationError::WalletFile { path, .. }) => {
                assert!(path.ends_with("wallet.properties"));
            }
            other => panic!("Expected WalletFile error, got {:?}", other),
        }
    }
}
