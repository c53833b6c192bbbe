//! Error types for valuation models.

use fairvalue_data::DataError;
use thiserror::Error;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while computing ratios, projections or valuations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A required line item is absent
    #[error("Missing field '{field}' in {statement}")]
    MissingField {
        /// Statement that was searched
        statement: String,
        /// Line item that was requested
        field: String,
    },

    /// A statement has no periods
    #[error("The {0} has no periods")]
    EmptyStatement(String),

    /// A required value is present but not a finite number
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Discount rate does not exceed the terminal growth rate
    #[error(
        "Invalid rate relationship: discount rate {discount_rate} must exceed terminal growth rate {terminal_growth_rate}"
    )]
    InvalidRateRelationship {
        /// Offending discount rate
        discount_rate: f64,
        /// Terminal growth rate it was compared against
        terminal_growth_rate: f64,
    },

    /// A scalar parameter is out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No projected periods to value
    #[error("Net income projections are empty")]
    EmptyProjection,

    /// No discount rates to sweep
    #[error("Sensitivity analysis needs at least one discount rate")]
    EmptyRates,

    /// Two values that must come from the same period do not
    #[error("Period mismatch: {0}")]
    PeriodMismatch(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying data error
    #[error(transparent)]
    Data(DataError),
}

impl From<DataError> for ModelError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::MissingField { statement, field } => Self::MissingField { statement, field },
            other => Self::Data(other),
        }
    }
}
