//! Offline company data from a JSON snapshot file.
//!
//! ```json
//! {
//!   "symbol": "ACME",
//!   "income_statement": {
//!     "periods": ["2022-12-31", "2023-12-31"],
//!     "line_items": { "Total Revenue": [900.0, 1000.0], "Net Income": [90.0, null] }
//!   },
//!   "balance_sheet": { "periods": [], "line_items": {} },
//!   "cash_flow": { "periods": [], "line_items": {} },
//!   "prices": [{ "date": "2024-01-02", "close": 101.5 }]
//! }
//! ```

use crate::error::{DataError, Result};
use crate::provider::StatementProvider;
use crate::statement::{CompanyData, StatementKind, StatementTable};
use crate::yahoo::quotes::{PriceBar, price_frame};
use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// One statement as stored in a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementSnapshot {
    /// Period end dates, oldest first
    #[serde(default)]
    pub periods: Vec<NaiveDate>,
    /// Values per line item, aligned with `periods`
    #[serde(default)]
    pub line_items: BTreeMap<String, Vec<Option<f64>>>,
}

/// A closing price observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricePoint {
    /// Session date
    pub date: NaiveDate,
    /// Closing price
    pub close: f64,
    /// Traded volume
    #[serde(default)]
    pub volume: u64,
}

/// Complete company snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ticker symbol
    pub symbol: String,
    /// Income statement
    #[serde(default)]
    pub income_statement: StatementSnapshot,
    /// Balance sheet
    #[serde(default)]
    pub balance_sheet: StatementSnapshot,
    /// Cash-flow statement
    #[serde(default)]
    pub cash_flow: StatementSnapshot,
    /// Daily closes, oldest first
    #[serde(default)]
    pub prices: Vec<PricePoint>,
}

impl StatementSnapshot {
    fn into_table(self, kind: StatementKind) -> Result<StatementTable> {
        if let Some((name, values)) = self
            .line_items
            .iter()
            .find(|(_, values)| values.len() != self.periods.len())
        {
            return Err(DataError::Parse(format!(
                "{kind} line item '{name}' has {} values for {} periods",
                values.len(),
                self.periods.len()
            )));
        }

        let canonical = kind.line_items();
        let mut items = self.line_items;
        let mut columns: Vec<Column> = Vec::with_capacity(items.len());
        for name in canonical {
            if let Some(values) = items.remove(*name) {
                columns.push(Series::new((*name).into(), values).into());
            }
        }
        for (name, values) in items {
            columns.push(Series::new(name.as_str().into(), values).into());
        }

        let frame = if columns.is_empty() {
            DataFrame::empty()
        } else {
            DataFrame::new(columns)?
        };
        StatementTable::new(kind, self.periods, frame)
    }
}

impl Snapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Read a snapshot file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let body = std::fs::read_to_string(path)?;
        Self::from_json(&body)
    }

    /// Convert into the statement tables and price frame.
    pub fn into_company_data(self) -> Result<CompanyData> {
        let bars: Vec<PriceBar> = self
            .prices
            .iter()
            .map(|p| PriceBar {
                timestamp: p.date.and_time(NaiveTime::MIN).and_utc().timestamp(),
                open: p.close,
                high: p.close,
                low: p.close,
                close: p.close,
                volume: p.volume,
                adjusted_close: p.close,
            })
            .collect();
        let prices = price_frame(&self.symbol, &bars)?;

        Ok(CompanyData {
            income_statement: self.income_statement.into_table(StatementKind::Income)?,
            balance_sheet: self.balance_sheet.into_table(StatementKind::BalanceSheet)?,
            cash_flow: self.cash_flow.into_table(StatementKind::CashFlow)?,
            symbol: self.symbol,
            prices,
        })
    }
}

/// Statement provider backed by a snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    path: PathBuf,
}

impl SnapshotProvider {
    /// Create a provider reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatementProvider for SnapshotProvider {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn fetch_company_data(&self, symbol: &str) -> Result<CompanyData> {
        let snapshot = Snapshot::from_file(&self.path)?;
        if !snapshot.symbol.eq_ignore_ascii_case(symbol) {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: format!(
                    "snapshot {} holds data for {}",
                    self.path.display(),
                    snapshot.symbol
                ),
            });
        }
        info!(symbol, path = %self.path.display(), "loaded snapshot");
        snapshot.into_company_data()
    }
}
