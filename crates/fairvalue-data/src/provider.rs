//! The statement provider capability.

use crate::error::Result;
use crate::statement::CompanyData;
use std::future::Future;

/// A source of financial statements and price history for one ticker.
///
/// A run performs exactly one fetch. Failures (unknown ticker, network,
/// malformed payload) are returned as-is; providers never retry.
pub trait StatementProvider {
    /// Short provider name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Fetch the income statement, balance sheet, cash-flow statement and
    /// price history for `symbol`.
    fn fetch_company_data(&self, symbol: &str) -> impl Future<Output = Result<CompanyData>> + Send;
}
