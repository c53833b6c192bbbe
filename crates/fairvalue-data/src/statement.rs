//! Financial statement tables and the per-company data bundle.

use crate::error::{DataError, Result};
use crate::series::FinancialSeries;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical line-item names shared by every provider.
pub mod line_items {
    /// Total revenue (net sales)
    pub const TOTAL_REVENUE: &str = "Total Revenue";
    /// Gross profit
    pub const GROSS_PROFIT: &str = "Gross Profit";
    /// Operating income
    pub const OPERATING_INCOME: &str = "Operating Income";
    /// Net income
    pub const NET_INCOME: &str = "Net Income";

    /// Total liabilities
    pub const TOTAL_LIABILITIES: &str = "Total Liabilities";
    /// Total stockholders' equity
    pub const TOTAL_STOCKHOLDER_EQUITY: &str = "Total Stockholder Equity";
    /// Total assets
    pub const TOTAL_ASSETS: &str = "Total Assets";

    /// Free cash flow
    pub const FREE_CASH_FLOW: &str = "Free Cash Flow";
    /// Cash from operating activities
    pub const OPERATING_CASH_FLOW: &str = "Operating Cash Flow";
    /// Capital expenditure (reported as a negative outflow)
    pub const CAPITAL_EXPENDITURE: &str = "Capital Expenditure";
}

/// The three statements a provider returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Income statement
    Income,
    /// Balance sheet
    BalanceSheet,
    /// Cash-flow statement
    CashFlow,
}

impl StatementKind {
    /// Canonical line items carried by this statement, in display order.
    pub const fn line_items(&self) -> &'static [&'static str] {
        match self {
            Self::Income => &[
                line_items::TOTAL_REVENUE,
                line_items::GROSS_PROFIT,
                line_items::OPERATING_INCOME,
                line_items::NET_INCOME,
            ],
            Self::BalanceSheet => &[
                line_items::TOTAL_ASSETS,
                line_items::TOTAL_LIABILITIES,
                line_items::TOTAL_STOCKHOLDER_EQUITY,
            ],
            Self::CashFlow => &[
                line_items::OPERATING_CASH_FLOW,
                line_items::CAPITAL_EXPENDITURE,
                line_items::FREE_CASH_FLOW,
            ],
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "income statement"),
            Self::BalanceSheet => write!(f, "balance sheet"),
            Self::CashFlow => write!(f, "cash flow statement"),
        }
    }
}

/// A single financial statement: one row per fiscal period, one column per line item.
///
/// Periods are kept outside the frame, sorted oldest first. Every column is
/// `Float64`; missing cells are null.
#[derive(Debug, Clone)]
pub struct StatementTable {
    kind: StatementKind,
    periods: Vec<NaiveDate>,
    frame: DataFrame,
}

impl StatementTable {
    /// Create a table from periods and a frame with one row per period.
    pub fn new(kind: StatementKind, periods: Vec<NaiveDate>, frame: DataFrame) -> Result<Self> {
        if frame.width() > 0 && frame.height() != periods.len() {
            return Err(DataError::Parse(format!(
                "{kind} has {} rows but {} periods",
                frame.height(),
                periods.len()
            )));
        }
        if periods.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DataError::Parse(format!(
                "{kind} periods must be strictly ascending"
            )));
        }

        Ok(Self {
            kind,
            periods,
            frame,
        })
    }

    /// An empty table for a statement the source did not provide.
    pub fn empty(kind: StatementKind) -> Self {
        Self {
            kind,
            periods: Vec::new(),
            frame: DataFrame::empty(),
        }
    }

    /// Build a table from per-line-item observations keyed by period end date.
    ///
    /// The period index is the union of all observed dates. Canonical line
    /// items come first, in [`StatementKind::line_items`] order, followed by any
    /// other items alphabetically. A line item with no observations is omitted.
    pub fn from_observations(
        kind: StatementKind,
        observations: &BTreeMap<String, BTreeMap<NaiveDate, f64>>,
    ) -> Result<Self> {
        let mut periods: Vec<NaiveDate> = observations
            .values()
            .flat_map(|by_date| by_date.keys().copied())
            .collect();
        periods.sort();
        periods.dedup();

        let canonical = kind.line_items();
        let ordered = canonical
            .iter()
            .filter_map(|name| observations.get_key_value(*name))
            .chain(
                observations
                    .iter()
                    .filter(|(name, _)| !canonical.contains(&name.as_str())),
            )
            .filter(|(_, by_date)| !by_date.is_empty());

        let columns: Vec<Column> = ordered
            .map(|(name, by_date)| {
                let values: Vec<Option<f64>> =
                    periods.iter().map(|p| by_date.get(p).copied()).collect();
                Series::new(name.as_str().into(), values).into()
            })
            .collect();

        let frame = if columns.is_empty() {
            DataFrame::empty()
        } else {
            DataFrame::new(columns)?
        };

        Self::new(kind, periods, frame)
    }

    /// Which statement this table holds.
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Period end dates, oldest first.
    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    /// Underlying frame, one `Float64` column per line item.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Number of periods.
    pub const fn len(&self) -> usize {
        self.periods.len()
    }

    /// Whether the table holds no periods.
    pub const fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Line items present in the table.
    pub fn fields(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Whether a line item column is present.
    pub fn has_field(&self, field: &str) -> bool {
        self.frame.get_column_names().iter().any(|c| c.as_str() == field)
    }

    /// Fail with [`DataError::MissingField`] for the first absent line item.
    pub fn require(&self, fields: &[&str]) -> Result<()> {
        match fields.iter().find(|f| !self.has_field(f)) {
            Some(field) => Err(self.missing(field)),
            None => Ok(()),
        }
    }

    /// Extract one line item as a [`FinancialSeries`]; nulls become `NaN`.
    pub fn series(&self, field: &str) -> Result<FinancialSeries> {
        if !self.has_field(field) {
            return Err(self.missing(field));
        }
        let values: Vec<f64> = self
            .frame
            .column(field)?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();

        FinancialSeries::new(field, self.periods.clone(), values)
            .ok_or_else(|| DataError::Parse(format!("{} misaligned in {}", field, self.kind)))
    }

    fn missing(&self, field: &str) -> DataError {
        DataError::MissingField {
            statement: self.kind.to_string(),
            field: field.to_string(),
        }
    }
}

/// Everything fetched for one company in a single run.
#[derive(Debug, Clone)]
pub struct CompanyData {
    /// Ticker symbol
    pub symbol: String,
    /// Annual income statement
    pub income_statement: StatementTable,
    /// Annual balance sheet
    pub balance_sheet: StatementTable,
    /// Annual cash-flow statement
    pub cash_flow: StatementTable,
    /// Daily price history (`symbol, date, open, high, low, close, volume, adjusted_close`)
    pub prices: DataFrame,
}

impl CompanyData {
    /// Most recent closing price, if the price history is not empty.
    pub fn last_close(&self) -> Option<f64> {
        let close = self.prices.column("close").ok()?.f64().ok()?;
        close.into_iter().flatten().last()
    }
}
