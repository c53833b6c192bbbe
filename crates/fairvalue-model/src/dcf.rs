//! Discounted cash flow valuation
//!
//! Projected net income is converted to free cash flow with a single
//! FCF-to-net-income ratio taken from the latest reported period. Each
//! projected flow is discounted by `(1 + r)^(i + 1)`, and a Gordon growth
//! terminal value on the final flow is discounted by `(1 + r)^years`.

use crate::error::{ModelError, Result};
use fairvalue_data::{StatementTable, line_items};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Enterprise value together with its breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Discount rate used
    pub discount_rate: f64,
    /// Perpetual growth rate used for the terminal value
    pub terminal_growth_rate: f64,
    /// Projected free cash flows
    pub free_cash_flows: Vec<f64>,
    /// Present value of each projected free cash flow
    pub discounted_free_cash_flows: Vec<f64>,
    /// Terminal value at the end of the horizon
    pub terminal_value: f64,
    /// Present value of the terminal value
    pub discounted_terminal_value: f64,
    /// Sum of discounted free cash flows and discounted terminal value
    pub enterprise_value: f64,
}

impl ValuationResult {
    /// Sum of the discounted projected free cash flows.
    pub fn present_value_of_cash_flows(&self) -> f64 {
        self.discounted_free_cash_flows.iter().sum()
    }

    /// Number of projected periods.
    pub const fn years(&self) -> usize {
        self.free_cash_flows.len()
    }
}

/// Reject a discount rate that does not exceed the terminal growth rate.
///
/// `NaN` on either side fails the comparison and is rejected as well.
pub fn check_rates(discount_rate: f64, terminal_growth_rate: f64) -> Result<()> {
    if discount_rate > terminal_growth_rate {
        Ok(())
    } else {
        Err(ModelError::InvalidRateRelationship {
            discount_rate,
            terminal_growth_rate,
        })
    }
}

/// Latest free cash flow divided by latest net income.
///
/// Both values must come from the same fiscal period.
pub fn fcf_to_net_income_ratio(cash_flow: &StatementTable, income: &StatementTable) -> Result<f64> {
    let fcf = cash_flow.series(line_items::FREE_CASH_FLOW)?;
    let net_income = income.series(line_items::NET_INCOME)?;

    let (fcf_period, fcf_value) = fcf
        .latest()
        .ok_or_else(|| ModelError::EmptyStatement(cash_flow.kind().to_string()))?;
    let (ni_period, ni_value) = net_income
        .latest()
        .ok_or_else(|| ModelError::EmptyStatement(income.kind().to_string()))?;

    if fcf_period != ni_period {
        return Err(ModelError::PeriodMismatch(format!(
            "latest free cash flow is for {fcf_period} but latest net income is for {ni_period}"
        )));
    }
    if !fcf_value.is_finite() {
        return Err(ModelError::MissingData(format!(
            "free cash flow for {fcf_period} is not reported"
        )));
    }
    if !ni_value.is_finite() {
        return Err(ModelError::MissingData(format!(
            "net income for {ni_period} is not reported"
        )));
    }
    if ni_value == 0.0 {
        return Err(ModelError::InvalidParameter(format!(
            "net income for {ni_period} is zero"
        )));
    }

    let ratio = fcf_value / ni_value;
    debug!(period = %fcf_period, fcf = fcf_value, net_income = ni_value, ratio, "fcf to net income");
    Ok(ratio)
}

/// Free cash flow for each projected period.
pub fn free_cash_flows(net_income: &[f64], fcf_to_ni_ratio: f64) -> Vec<f64> {
    net_income.iter().map(|ni| ni * fcf_to_ni_ratio).collect()
}

/// Gordon growth terminal value on the final free cash flow.
pub fn terminal_value(last_free_cash_flow: f64, discount_rate: f64, terminal_growth_rate: f64) -> Result<f64> {
    check_rates(discount_rate, terminal_growth_rate)?;
    Ok(last_free_cash_flow * (1.0 + terminal_growth_rate) / (discount_rate - terminal_growth_rate))
}

/// Present value of each cash flow, the first discounted by one full period.
pub fn discount_cash_flows(cash_flows: &[f64], discount_rate: f64) -> Vec<f64> {
    cash_flows
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / (1.0 + discount_rate).powi(exponent(i + 1)))
        .collect()
}

/// Present value of an amount received after `years` periods.
pub fn discount_terminal_value(terminal_value: f64, discount_rate: f64, years: usize) -> f64 {
    terminal_value / (1.0 + discount_rate).powi(exponent(years))
}

/// Value projected net income with a fixed FCF ratio and a Gordon growth terminal value.
///
/// # Examples
///
/// ```
/// use fairvalue_model::dcf_valuation;
///
/// let valuation = dcf_valuation(&[200.0, 220.0, 242.0], 1.0, 0.10, 0.02).unwrap();
/// assert!((valuation.enterprise_value - 31_500.0 / 11.0).abs() < 1e-6);
/// ```
pub fn dcf_valuation(
    net_income: &[f64],
    fcf_to_ni_ratio: f64,
    discount_rate: f64,
    terminal_growth_rate: f64,
) -> Result<ValuationResult> {
    check_rates(discount_rate, terminal_growth_rate)?;
    let free_cash_flows = free_cash_flows(net_income, fcf_to_ni_ratio);
    let last = *free_cash_flows.last().ok_or(ModelError::EmptyProjection)?;

    let terminal_value = terminal_value(last, discount_rate, terminal_growth_rate)?;
    Ok(discounted(
        free_cash_flows,
        terminal_value,
        discount_rate,
        terminal_growth_rate,
    ))
}

/// Discount projected flows and an already computed terminal value.
pub(crate) fn discounted(
    free_cash_flows: Vec<f64>,
    terminal_value: f64,
    discount_rate: f64,
    terminal_growth_rate: f64,
) -> ValuationResult {
    let discounted_free_cash_flows = discount_cash_flows(&free_cash_flows, discount_rate);
    let discounted_terminal_value =
        discount_terminal_value(terminal_value, discount_rate, free_cash_flows.len());
    let enterprise_value =
        discounted_free_cash_flows.iter().sum::<f64>() + discounted_terminal_value;

    ValuationResult {
        discount_rate,
        terminal_growth_rate,
        free_cash_flows,
        discounted_free_cash_flows,
        terminal_value,
        discounted_terminal_value,
        enterprise_value,
    }
}

fn exponent(periods: usize) -> i32 {
    i32::try_from(periods).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use fairvalue_data::StatementKind;
    use rstest::rstest;
    use std::collections::BTreeMap;

    const NET_INCOME: [f64; 3] = [200.0, 220.0, 242.0];

    fn table(kind: StatementKind, field: &str, points: &[(i32, f64)]) -> StatementTable {
        let values: BTreeMap<NaiveDate, f64> = points
            .iter()
            .map(|(y, v)| (NaiveDate::from_ymd_opt(*y, 12, 31).unwrap(), *v))
            .collect();
        let obs = BTreeMap::from([(field.to_string(), values)]);
        StatementTable::from_observations(kind, &obs).unwrap()
    }

    #[test]
    fn test_worked_example() {
        let valuation = dcf_valuation(&NET_INCOME, 1.0, 0.10, 0.02).unwrap();

        assert_relative_eq!(valuation.terminal_value, 3085.5, max_relative = 1e-12);
        for dfcf in &valuation.discounted_free_cash_flows {
            assert_relative_eq!(*dfcf, 200.0 / 1.1, max_relative = 1e-9);
        }
        assert_relative_eq!(
            valuation.discounted_terminal_value,
            3085.5 / 1.331,
            max_relative = 1e-9
        );
        assert_relative_eq!(valuation.enterprise_value, 31_500.0 / 11.0, max_relative = 1e-6);
        assert_relative_eq!(
            valuation.present_value_of_cash_flows() + valuation.discounted_terminal_value,
            valuation.enterprise_value,
            max_relative = 1e-12
        );
        assert_eq!(valuation.years(), 3);
    }

    #[test]
    fn test_ratio_scales_value() {
        let base = dcf_valuation(&NET_INCOME, 1.0, 0.10, 0.02).unwrap();
        let half = dcf_valuation(&NET_INCOME, 0.5, 0.10, 0.02).unwrap();
        assert_relative_eq!(half.enterprise_value * 2.0, base.enterprise_value, max_relative = 1e-12);
        assert_relative_eq!(half.free_cash_flows[2], 121.0);
    }

    #[test]
    fn test_strictly_decreasing_in_discount_rate() {
        let values: Vec<f64> = [0.03, 0.05, 0.08, 0.10, 0.12, 0.20]
            .iter()
            .map(|r| dcf_valuation(&NET_INCOME, 0.9, *r, 0.02).unwrap().enterprise_value)
            .collect();
        assert!(values.windows(2).all(|w| w[0] > w[1]));
    }

    #[rstest]
    #[case(0.02, 0.02)]
    #[case(0.01, 0.02)]
    #[case(f64::NAN, 0.02)]
    fn test_rejects_rate_at_or_below_growth(#[case] r: f64, #[case] g: f64) {
        let err = dcf_valuation(&NET_INCOME, 1.0, r, g).unwrap_err();
        assert!(matches!(err, ModelError::InvalidRateRelationship { .. }));
    }

    #[test]
    fn test_rate_error_names_both_rates() {
        let err = dcf_valuation(&NET_INCOME, 1.0, 0.01, 0.02).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("0.01"));
        assert!(msg.contains("0.02"));
    }

    #[test]
    fn test_empty_projection() {
        let err = dcf_valuation(&[], 1.0, 0.10, 0.02).unwrap_err();
        assert!(matches!(err, ModelError::EmptyProjection));
    }

    #[test]
    fn test_fcf_ratio_from_latest_period() {
        let cash_flow = table(
            StatementKind::CashFlow,
            line_items::FREE_CASH_FLOW,
            &[(2022, 70.0), (2023, 150.0)],
        );
        let income = table(
            StatementKind::Income,
            line_items::NET_INCOME,
            &[(2022, 80.0), (2023, 200.0)],
        );
        let ratio = fcf_to_net_income_ratio(&cash_flow, &income).unwrap();
        assert_relative_eq!(ratio, 0.75);
    }

    #[test]
    fn test_fcf_ratio_period_mismatch() {
        let cash_flow = table(
            StatementKind::CashFlow,
            line_items::FREE_CASH_FLOW,
            &[(2022, 70.0)],
        );
        let income = table(
            StatementKind::Income,
            line_items::NET_INCOME,
            &[(2022, 80.0), (2023, 200.0)],
        );
        let err = fcf_to_net_income_ratio(&cash_flow, &income).unwrap_err();
        assert!(matches!(err, ModelError::PeriodMismatch(_)));
    }

    #[test]
    fn test_fcf_ratio_missing_values() {
        let cash_flow = table(
            StatementKind::CashFlow,
            line_items::FREE_CASH_FLOW,
            &[(2023, f64::NAN)],
        );
        let income = table(StatementKind::Income, line_items::NET_INCOME, &[(2023, 200.0)]);
        assert!(matches!(
            fcf_to_net_income_ratio(&cash_flow, &income),
            Err(ModelError::MissingData(_))
        ));

        let no_fcf = table(
            StatementKind::CashFlow,
            line_items::OPERATING_CASH_FLOW,
            &[(2023, 10.0)],
        );
        assert!(matches!(
            fcf_to_net_income_ratio(&no_fcf, &income),
            Err(ModelError::MissingField { .. })
        ));
    }

    #[test]
    fn test_fcf_ratio_zero_net_income() {
        let cash_flow = table(StatementKind::CashFlow, line_items::FREE_CASH_FLOW, &[(2023, 5.0)]);
        let income = table(StatementKind::Income, line_items::NET_INCOME, &[(2023, 0.0)]);
        assert!(matches!(
            fcf_to_net_income_ratio(&cash_flow, &income),
            Err(ModelError::InvalidParameter(_))
        ));
    }
}
