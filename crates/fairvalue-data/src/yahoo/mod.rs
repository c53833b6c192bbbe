//! Yahoo Finance data providers.

pub mod quotes;
pub mod statements;

pub use quotes::{PriceBar, YahooQuoteProvider, price_frame};
pub use statements::{AnnualStatements, YahooStatementProvider, parse_timeseries};
