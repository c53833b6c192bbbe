//! SEC EDGAR statement provider.
//!
//! Resolves a ticker to its CIK through the SEC ticker map, downloads the
//! company facts document and keeps full-year 10-K figures.
//!
//! # Example
//!
//! ```no_run
//! use fairvalue_data::StatementProvider;
//! use fairvalue_data::edgar::EdgarStatementProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = EdgarStatementProvider::new(5)?;
//!     let data = provider.fetch_company_data("AAPL").await?;
//!     println!("{} annual income statements", data.income_statement.len());
//!     Ok(())
//! }
//! ```

pub mod facts;

pub use facts::{CompanyFacts, EdgarStatementProvider};
