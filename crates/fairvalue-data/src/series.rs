//! Period-indexed numeric series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An ordered sequence of values indexed by fiscal period, oldest first.
///
/// Missing observations are stored as `NaN` so that element-wise arithmetic
/// keeps its shape. The last element is always the most recent period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSeries {
    name: String,
    periods: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl FinancialSeries {
    /// Create a series from aligned periods and values.
    ///
    /// Returns `None` when the two vectors differ in length.
    pub fn new(name: impl Into<String>, periods: Vec<NaiveDate>, values: Vec<f64>) -> Option<Self> {
        (periods.len() == values.len()).then(|| Self {
            name: name.into(),
            periods,
            values,
        })
    }

    /// Series name (line item or ratio name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Period end dates, oldest first.
    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    /// Values aligned with [`Self::periods`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of periods.
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no periods.
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Most recent period and its value.
    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        Some((*self.periods.last()?, *self.values.last()?))
    }

    /// Most recent value, if it is a finite number.
    pub fn latest_finite(&self) -> Option<f64> {
        self.values.last().copied().filter(|v| v.is_finite())
    }

    /// Iterate over `(period, value)` pairs, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.periods.iter().copied().zip(self.values.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 9, 30).unwrap()
    }

    #[test]
    fn test_new_rejects_misaligned() {
        assert!(FinancialSeries::new("x", vec![date(2023)], vec![]).is_none());
    }

    #[test]
    fn test_latest() {
        let s =
            FinancialSeries::new("Total Revenue", vec![date(2022), date(2023)], vec![1.0, 2.0])
                .unwrap();
        assert_eq!(s.latest(), Some((date(2023), 2.0)));
        assert_eq!(s.latest_finite(), Some(2.0));
        assert_eq!(s.len(), 2);
        assert_eq!(s.name(), "Total Revenue");
    }

    #[test]
    fn test_latest_finite_skips_nan() {
        let s = FinancialSeries::new("x", vec![date(2023)], vec![f64::NAN]).unwrap();
        assert!(s.latest().is_some());
        assert!(s.latest_finite().is_none());
    }
}
