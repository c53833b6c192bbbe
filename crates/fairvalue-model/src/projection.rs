//! Constant-growth revenue and net income projection.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};

/// Projected revenue and net income; index 0 is the first future period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    /// Projected revenue
    pub revenue: Vec<f64>,
    /// Projected net income
    pub net_income: Vec<f64>,
}

impl ProjectionResult {
    /// Number of projected periods.
    pub const fn years(&self) -> usize {
        self.revenue.len()
    }
}

/// Project revenue at a constant growth rate and net income at a constant margin.
///
/// `revenue[i] = initial_revenue * (1 + growth_rate)^i`, so the first projected
/// period carries the base revenue unescalated. `net_income[i] = revenue[i] *
/// terminal_net_profit_margin`.
///
/// Non-finite inputs propagate into the result.
///
/// # Examples
///
/// ```
/// use fairvalue_model::project_financials;
///
/// let projection = project_financials(1000.0, 0.2, 0.1, 3).unwrap();
/// assert_eq!(projection.revenue[0], 1000.0);
/// assert_eq!(projection.years(), 3);
/// ```
pub fn project_financials(
    initial_revenue: f64,
    terminal_net_profit_margin: f64,
    growth_rate: f64,
    years: usize,
) -> Result<ProjectionResult> {
    if growth_rate.is_nan() || growth_rate <= -1.0 {
        return Err(ModelError::InvalidParameter(format!(
            "growth rate must be greater than -1, got {growth_rate}"
        )));
    }
    if years == 0 {
        return Err(ModelError::InvalidParameter(
            "projection horizon must be at least one year".to_string(),
        ));
    }
    let horizon = i32::try_from(years).map_err(|_| {
        ModelError::InvalidParameter(format!("projection horizon of {years} years is too long"))
    })?;

    let revenue: Vec<f64> = (0..horizon)
        .map(|i| initial_revenue * (1.0 + growth_rate).powi(i))
        .collect();
    let net_income = revenue
        .iter()
        .map(|rev| rev * terminal_net_profit_margin)
        .collect();

    Ok(ProjectionResult {
        revenue,
        net_income,
    })
}
