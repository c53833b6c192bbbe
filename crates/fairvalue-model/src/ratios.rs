//! Profitability and leverage ratios
//!
//! Margins are computed against total revenue and indexed by the income
//! statement's periods; debt-to-equity is indexed by the balance sheet's
//! periods. A zero denominator yields an infinite or `NaN` ratio rather than
//! an error.

use crate::error::{ModelError, Result};
use fairvalue_data::{FinancialSeries, StatementTable, line_items};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Gross margin column name
pub const GROSS_MARGIN: &str = "gross_margin";
/// Operating margin column name
pub const OPERATING_MARGIN: &str = "operating_margin";
/// Net profit margin column name
pub const NET_PROFIT_MARGIN: &str = "net_profit_margin";
/// Debt-to-equity column name
pub const DEBT_TO_EQUITY: &str = "debt_to_equity";

/// Income statement line items the margins need.
pub const REQUIRED_INCOME_FIELDS: [&str; 4] = [
    line_items::GROSS_PROFIT,
    line_items::OPERATING_INCOME,
    line_items::NET_INCOME,
    line_items::TOTAL_REVENUE,
];

/// Balance sheet line items the leverage ratio needs.
pub const REQUIRED_BALANCE_FIELDS: [&str; 2] = [
    line_items::TOTAL_LIABILITIES,
    line_items::TOTAL_STOCKHOLDER_EQUITY,
];

/// Margin and leverage ratios per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioSet {
    /// Gross profit / total revenue
    pub gross_margin: FinancialSeries,
    /// Operating income / total revenue
    pub operating_margin: FinancialSeries,
    /// Net income / total revenue
    pub net_profit_margin: FinancialSeries,
    /// Total liabilities / total stockholder equity
    pub debt_to_equity: FinancialSeries,
}

impl RatioSet {
    /// Ratios in display order, keyed by name.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FinancialSeries)> {
        [
            (GROSS_MARGIN, &self.gross_margin),
            (OPERATING_MARGIN, &self.operating_margin),
            (NET_PROFIT_MARGIN, &self.net_profit_margin),
            (DEBT_TO_EQUITY, &self.debt_to_equity),
        ]
        .into_iter()
    }

    /// Look up a ratio by name.
    pub fn get(&self, name: &str) -> Option<&FinancialSeries> {
        self.iter().find(|(n, _)| *n == name).map(|(_, s)| s)
    }
}

/// Compute the four ratios element-wise from the income statement and balance sheet.
pub fn compute_ratios(income: &StatementTable, balance: &StatementTable) -> Result<RatioSet> {
    income.require(&REQUIRED_INCOME_FIELDS)?;
    balance.require(&REQUIRED_BALANCE_FIELDS)?;
    for table in [income, balance] {
        if table.is_empty() {
            return Err(ModelError::EmptyStatement(table.kind().to_string()));
        }
    }

    let revenue = col(line_items::TOTAL_REVENUE);
    let margins = income
        .frame()
        .clone()
        .lazy()
        .select([
            (col(line_items::GROSS_PROFIT) / revenue.clone()).alias(GROSS_MARGIN),
            (col(line_items::OPERATING_INCOME) / revenue.clone()).alias(OPERATING_MARGIN),
            (col(line_items::NET_INCOME) / revenue).alias(NET_PROFIT_MARGIN),
        ])
        .collect()?;

    let leverage = balance
        .frame()
        .clone()
        .lazy()
        .select([(col(line_items::TOTAL_LIABILITIES)
            / col(line_items::TOTAL_STOCKHOLDER_EQUITY))
        .alias(DEBT_TO_EQUITY)])
        .collect()?;

    Ok(RatioSet {
        gross_margin: column_series(&margins, GROSS_MARGIN, income)?,
        operating_margin: column_series(&margins, OPERATING_MARGIN, income)?,
        net_profit_margin: column_series(&margins, NET_PROFIT_MARGIN, income)?,
        debt_to_equity: column_series(&leverage, DEBT_TO_EQUITY, balance)?,
    })
}

fn column_series(frame: &DataFrame, name: &str, source: &StatementTable) -> Result<FinancialSeries> {
    let values: Vec<f64> = frame
        .column(name)?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    FinancialSeries::new(name, source.periods().to_vec(), values).ok_or_else(|| {
        ModelError::PeriodMismatch(format!("{name} does not line up with the {}", source.kind()))
    })
}
