#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fairvalue/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod edgar;
pub mod error;
pub mod provider;
pub mod series;
pub mod snapshot;
pub mod statement;
pub mod yahoo;

pub use edgar::EdgarStatementProvider;
pub use error::{DataError, Result};
pub use provider::StatementProvider;
pub use series::FinancialSeries;
pub use snapshot::{Snapshot, SnapshotProvider};
pub use statement::{CompanyData, StatementKind, StatementTable, line_items};
pub use yahoo::YahooStatementProvider;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
