//! Price history from Yahoo Finance.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// One daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    /// Unix timestamp (seconds) of the session
    pub timestamp: i64,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Traded volume
    pub volume: u64,
    /// Split/dividend adjusted close
    pub adjusted_close: f64,
}

/// Build a price-history frame from bars.
///
/// Columns: `symbol, date, open, high, low, close, volume, adjusted_close`.
/// An empty slice yields an empty frame with the same schema.
pub fn price_frame(symbol: &str, bars: &[PriceBar]) -> Result<DataFrame> {
    let dates: Vec<i64> = bars.iter().map(|q| q.timestamp).collect();
    let opens: Vec<f64> = bars.iter().map(|q| q.open).collect();
    let highs: Vec<f64> = bars.iter().map(|q| q.high).collect();
    let lows: Vec<f64> = bars.iter().map(|q| q.low).collect();
    let closes: Vec<f64> = bars.iter().map(|q| q.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|q| q.volume).collect();
    let adj_closes: Vec<f64> = bars.iter().map(|q| q.adjusted_close).collect();
    let symbols: Vec<&str> = vec![symbol; bars.len()];

    let df = DataFrame::new(vec![
        Series::new("symbol".into(), symbols).into(),
        Series::new("timestamp".into(), dates).into(),
        Series::new("open".into(), opens).into(),
        Series::new("high".into(), highs).into(),
        Series::new("low".into(), lows).into(),
        Series::new("close".into(), closes).into(),
        Series::new("volume".into(), volumes).into(),
        Series::new("adjusted_close".into(), adj_closes).into(),
    ])?;

    let df = df
        .lazy()
        .with_column(
            (col("timestamp") * lit(1_000_000_000))
                .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                .cast(DataType::Date)
                .alias("date"),
        )
        .select(&[
            col("symbol"),
            col("date"),
            col("open"),
            col("high"),
            col("low"),
            col("close"),
            col("volume"),
            col("adjusted_close"),
        ])
        .collect()?;

    Ok(df)
}

/// Yahoo Finance price history provider.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider").finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a new Yahoo Finance quote provider.
    pub fn new() -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
        })
    }

    /// Fetch daily OHLCV data for a single symbol.
    ///
    /// # Arguments
    /// * `symbol` - The ticker symbol (e.g., "AAPL")
    /// * `start` - Start date for the data
    /// * `end` - End date for the data
    ///
    /// # Returns
    /// A Polars DataFrame with columns: symbol, date, open, high, low, close, volume, adjusted_close
    pub async fn fetch_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DataFrame> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }

        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        // yahoo_finance_api speaks time::OffsetDateTime
        let start_time = time::OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;
        let end_time = time::OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;

        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::YahooApi(e.to_string()))?;

        if quotes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No price history returned from Yahoo Finance".to_string(),
            });
        }
        debug!(symbol, bars = quotes.len(), "fetched price history");

        let bars: Vec<PriceBar> = quotes
            .iter()
            .map(|q| PriceBar {
                timestamp: q.timestamp,
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
                adjusted_close: q.adjclose,
            })
            .collect();

        price_frame(symbol, &bars)
    }
}
