//! Enterprise value across a sweep of discount rates.

use crate::dcf::{self, check_rates};
use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the terminal value is priced during a sensitivity sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalValuePolicy {
    /// Compute the terminal value once at the first swept rate and only
    /// re-discount it for the others.
    #[default]
    FixedAtFirstRate,
    /// Recompute the terminal value at every swept rate.
    RepricedPerRate,
}

/// One point of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    /// Discount rate
    pub discount_rate: f64,
    /// Enterprise value at that rate
    pub enterprise_value: f64,
}

/// Sweep results in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    /// Terminal growth rate held constant across the sweep
    pub terminal_growth_rate: f64,
    /// Terminal value pricing used
    pub policy: TerminalValuePolicy,
    /// One point per swept rate
    pub points: Vec<SensitivityPoint>,
}

impl SensitivityResult {
    /// Swept discount rates.
    pub fn discount_rates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.discount_rate).collect()
    }

    /// Enterprise values, aligned with [`Self::discount_rates`].
    pub fn enterprise_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.enterprise_value).collect()
    }

    /// Number of points.
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the sweep is empty.
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over the points.
    pub fn iter(&self) -> impl Iterator<Item = &SensitivityPoint> {
        self.points.iter()
    }
}

/// Value the projection at each discount rate.
///
/// With [`TerminalValuePolicy::FixedAtFirstRate`] only the first rate has to
/// exceed the terminal growth rate; with [`TerminalValuePolicy::RepricedPerRate`]
/// every rate does, and each point equals a full [`dcf::dcf_valuation`].
pub fn sensitivity_analysis(
    net_income: &[f64],
    fcf_to_ni_ratio: f64,
    discount_rates: &[f64],
    terminal_growth_rate: f64,
    policy: TerminalValuePolicy,
) -> Result<SensitivityResult> {
    let first_rate = *discount_rates.first().ok_or(ModelError::EmptyRates)?;
    if net_income.is_empty() {
        return Err(ModelError::EmptyProjection);
    }

    let points = match policy {
        TerminalValuePolicy::FixedAtFirstRate => {
            check_rates(first_rate, terminal_growth_rate)?;
            let free_cash_flows = dcf::free_cash_flows(net_income, fcf_to_ni_ratio);
            let last = *free_cash_flows.last().ok_or(ModelError::EmptyProjection)?;
            let terminal_value = dcf::terminal_value(last, first_rate, terminal_growth_rate)?;
            debug!(first_rate, terminal_value, "terminal value fixed for sweep");

            discount_rates
                .iter()
                .map(|&rate| SensitivityPoint {
                    discount_rate: rate,
                    enterprise_value: dcf::discounted(
                        free_cash_flows.clone(),
                        terminal_value,
                        rate,
                        terminal_growth_rate,
                    )
                    .enterprise_value,
                })
                .collect()
        }
        TerminalValuePolicy::RepricedPerRate => discount_rates
            .iter()
            .map(|&rate| {
                dcf::dcf_valuation(net_income, fcf_to_ni_ratio, rate, terminal_growth_rate).map(
                    |v| SensitivityPoint {
                        discount_rate: rate,
                        enterprise_value: v.enterprise_value,
                    },
                )
            })
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(SensitivityResult {
        terminal_growth_rate,
        policy,
        points,
    })
}

/// Evenly spaced values from `start` to `end` inclusive.
///
/// One point yields `[start]` and zero points yield an empty vector.
///
/// # Examples
///
/// ```
/// use fairvalue_model::linspace;
///
/// let rates = linspace(0.08, 0.12, 5);
/// assert_eq!(rates.len(), 5);
/// assert_eq!(rates[0], 0.08);
/// assert_eq!(rates[4], 0.12);
/// ```
pub fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            values[n - 1] = end;
            values
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const NET_INCOME: [f64; 3] = [200.0, 220.0, 242.0];

    #[test]
    fn test_linspace() {
        let rates = linspace(0.08, 0.12, 5);
        let expected = [0.08, 0.09, 0.10, 0.11, 0.12];
        for (got, want) in rates.iter().zip(expected) {
            assert_relative_eq!(*got, want, max_relative = 1e-12);
        }
        assert_eq!(linspace(0.1, 0.2, 1), vec![0.1]);
        assert!(linspace(0.1, 0.2, 0).is_empty());
    }

    #[test]
    fn test_fixed_terminal_value_at_first_rate() {
        let result = sensitivity_analysis(
            &NET_INCOME,
            1.0,
            &[0.08, 0.10],
            0.02,
            TerminalValuePolicy::FixedAtFirstRate,
        )
        .unwrap();

        // 242 * 1.02 / 0.06, discounted at 10% for the second point.
        let expected = 600.0 / 1.1 + 4114.0 / 1.331;
        assert_relative_eq!(result.points[1].enterprise_value, expected, max_relative = 1e-9);

        let first = dcf::dcf_valuation(&NET_INCOME, 1.0, 0.08, 0.02).unwrap();
        assert_relative_eq!(
            result.points[0].enterprise_value,
            first.enterprise_value,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_repriced_matches_full_valuation() {
        let rates = linspace(0.08, 0.12, 5);
        let result = sensitivity_analysis(
            &NET_INCOME,
            0.8,
            &rates,
            0.02,
            TerminalValuePolicy::RepricedPerRate,
        )
        .unwrap();

        for point in result.iter() {
            let full = dcf::dcf_valuation(&NET_INCOME, 0.8, point.discount_rate, 0.02).unwrap();
            assert_relative_eq!(point.enterprise_value, full.enterprise_value, max_relative = 1e-12);
        }
    }

    #[rstest]
    #[case(TerminalValuePolicy::FixedAtFirstRate)]
    #[case(TerminalValuePolicy::RepricedPerRate)]
    fn test_preserves_input_order(#[case] policy: TerminalValuePolicy) {
        let rates = [0.12, 0.08, 0.10];
        let result = sensitivity_analysis(&NET_INCOME, 1.0, &rates, 0.02, policy).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.discount_rates(), rates.to_vec());
        assert_eq!(result.policy, policy);
        let values = result.enterprise_values();
        assert!(values[1] > values[2] && values[2] > values[0]);
    }

    #[test]
    fn test_fixed_policy_only_checks_first_rate() {
        let result = sensitivity_analysis(
            &NET_INCOME,
            1.0,
            &[0.08, 0.01],
            0.02,
            TerminalValuePolicy::FixedAtFirstRate,
        );
        assert!(result.is_ok());

        let err = sensitivity_analysis(
            &NET_INCOME,
            1.0,
            &[0.01, 0.08],
            0.02,
            TerminalValuePolicy::FixedAtFirstRate,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidRateRelationship { .. }));
    }

    #[test]
    fn test_repriced_policy_checks_every_rate() {
        let err = sensitivity_analysis(
            &NET_INCOME,
            1.0,
            &[0.08, 0.01],
            0.02,
            TerminalValuePolicy::RepricedPerRate,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidRateRelationship { .. }));
    }

    #[test]
    fn test_empty_inputs() {
        let policy = TerminalValuePolicy::default();
        assert!(matches!(
            sensitivity_analysis(&NET_INCOME, 1.0, &[], 0.02, policy),
            Err(ModelError::EmptyRates)
        ));
        assert!(matches!(
            sensitivity_analysis(&[], 1.0, &[0.1], 0.02, policy),
            Err(ModelError::EmptyProjection)
        ));
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&TerminalValuePolicy::RepricedPerRate).unwrap();
        assert_eq!(json, "\"repriced_per_rate\"");
        let policy: TerminalValuePolicy = serde_json::from_str("\"fixed_at_first_rate\"").unwrap();
        assert_eq!(policy, TerminalValuePolicy::FixedAtFirstRate);
    }
}
