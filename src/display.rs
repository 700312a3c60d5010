use std::fmt;

use crate::aggregator::BalanceMap;
use crate::price::RateMap;

/// One priced currency
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationLine {
    pub ticker: String,
    pub balance: f64,
    pub rate: f64,
    pub value: f64,
}

/// Priced balances plus the grand total, rendered as the final report
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub fiat: String,
    pub lines: Vec<ValuationLine>,
    pub total: f64,
}

impl Valuation {
    /// Multiply each balance by its rate. Currencies with no rate at all are
    /// left out of both the lines and the total.
    pub fn compute(balances: &BalanceMap, rates: &RateMap, fiat: &str) -> Self {
        let lines: Vec<ValuationLine> = balances
            .iter()
            .filter_map(|(ticker, &balance)| {
                let &rate = rates.get(ticker)?;
                Some(ValuationLine {
                    ticker: ticker.clone(),
                    balance,
                    rate,
                    value: balance * rate,
                })
            })
            .collect();

        // an empty f64 sum() is -0.0
        let total = lines.iter().fold(0.0, |acc, line| acc + line.value);

        Self {
            fiat: fiat.to_string(),
            lines,
            total,
        }
    }
}

impl fmt::Display for Valuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(
                f,
                "{:.8} {} at {:.2} {}/{} : {:.2} {}",
                line.balance, line.ticker, line.rate, self.fiat, line.ticker, line.value, self.fiat
            )?;
        }
        write!(f, "\tTotal: {:.2} {}", self.total, self.fiat)
    }
}

/// Print the valuation report to stdout
pub fn print_valuation(valuation: &Valuation) {
    println!("{}", valuation);
}
