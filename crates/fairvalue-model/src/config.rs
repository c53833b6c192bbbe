//! Valuation configuration.

use crate::dcf::check_rates;
use crate::error::{ModelError, Result};
use crate::sensitivity::{TerminalValuePolicy, linspace};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Discount rate sweep for the sensitivity analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First rate
    pub start: f64,
    /// Last rate, inclusive
    pub end: f64,
    /// Number of rates
    pub points: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start: 0.08,
            end: 0.12,
            points: 5,
        }
    }
}

impl SweepConfig {
    /// Evenly spaced rates from `start` to `end`.
    pub fn rates(&self) -> Vec<f64> {
        linspace(self.start, self.end, self.points)
    }
}

/// Every parameter of one valuation run.
///
/// Missing fields in a configuration file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Ticker symbol
    pub ticker: String,
    /// Annual revenue growth rate for the projection
    pub growth_rate: f64,
    /// Projection horizon in years
    pub years: usize,
    /// Discount rate for the headline valuation
    pub discount_rate: f64,
    /// Perpetual growth rate for the terminal value
    pub terminal_growth_rate: f64,
    /// Discount rate sweep
    pub sweep: SweepConfig,
    /// Terminal value pricing during the sweep
    pub terminal_value_policy: TerminalValuePolicy,
    /// Years of price history to fetch
    pub history_years: u32,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            growth_rate: 0.10,
            years: 5,
            discount_rate: 0.10,
            terminal_growth_rate: 0.02,
            sweep: SweepConfig::default(),
            terminal_value_policy: TerminalValuePolicy::default(),
            history_years: 5,
        }
    }
}

impl ValuationConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&body)
            .map_err(|e| ModelError::Config(format!("{}: {e}", path.display())))
    }

    /// Discount rates for the sensitivity sweep.
    pub fn sweep_rates(&self) -> Vec<f64> {
        self.sweep.rates()
    }

    /// Check every parameter before any data is processed.
    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(ModelError::InvalidParameter("ticker is empty".to_string()));
        }
        if self.growth_rate.is_nan() || self.growth_rate <= -1.0 {
            return Err(ModelError::InvalidParameter(format!(
                "growth rate must be greater than -1, got {}",
                self.growth_rate
            )));
        }
        if self.years == 0 {
            return Err(ModelError::InvalidParameter(
                "projection horizon must be at least one year".to_string(),
            ));
        }
        if self.history_years == 0 {
            return Err(ModelError::InvalidParameter(
                "price history must cover at least one year".to_string(),
            ));
        }
        if self.terminal_growth_rate.is_nan() || self.terminal_growth_rate <= -1.0 {
            return Err(ModelError::InvalidParameter(format!(
                "terminal growth rate must be greater than -1, got {}",
                self.terminal_growth_rate
            )));
        }
        check_rates(self.discount_rate, self.terminal_growth_rate)?;

        if !self.sweep.start.is_finite() || !self.sweep.end.is_finite() {
            return Err(ModelError::InvalidParameter(
                "sweep bounds must be finite".to_string(),
            ));
        }
        let rates = self.sweep_rates();
        let first = *rates.first().ok_or(ModelError::EmptyRates)?;
        match self.terminal_value_policy {
            TerminalValuePolicy::FixedAtFirstRate => check_rates(first, self.terminal_growth_rate)?,
            TerminalValuePolicy::RepricedPerRate => {
                for rate in &rates {
                    check_rates(*rate, self.terminal_growth_rate)?;
                }
            }
        }
        if let Some(rate) = rates.iter().find(|r| **r <= -1.0) {
            return Err(ModelError::InvalidParameter(format!(
                "discount rate must be greater than -1, got {rate}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = ValuationConfig::default();
        assert_eq!(config.ticker, "AAPL");
        assert_eq!(config.years, 5);
        assert_relative_eq!(config.growth_rate, 0.10);
        assert_relative_eq!(config.discount_rate, 0.10);
        assert_relative_eq!(config.terminal_growth_rate, 0.02);
        assert_eq!(config.terminal_value_policy, TerminalValuePolicy::FixedAtFirstRate);
        assert_eq!(config.sweep_rates().len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_discount_rate_at_growth() {
        let config = ValuationConfig {
            discount_rate: 0.02,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidRateRelationship { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let cases = [
            ValuationConfig {
                years: 0,
                ..Default::default()
            },
            ValuationConfig {
                growth_rate: -1.0,
                ..Default::default()
            },
            ValuationConfig {
                ticker: "  ".to_string(),
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(ModelError::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_sweep_checks_follow_policy() {
        let mut config = ValuationConfig {
            sweep: SweepConfig {
                start: 0.05,
                end: 0.0,
                points: 3,
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.terminal_value_policy = TerminalValuePolicy::RepricedPerRate;
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidRateRelationship { .. })
        ));

        config.sweep.points = 0;
        assert!(matches!(config.validate(), Err(ModelError::EmptyRates)));
    }

    #[test]
    fn test_partial_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"ticker": "MSFT", "years": 3, "sweep": {"points": 9}, "terminal_value_policy": "repriced_per_rate"}"#,
        )
        .unwrap();

        let config = ValuationConfig::from_json_file(&path).unwrap();
        assert_eq!(config.ticker, "MSFT");
        assert_eq!(config.years, 3);
        assert_eq!(config.sweep.points, 9);
        assert_relative_eq!(config.sweep.start, 0.08);
        assert_eq!(config.terminal_value_policy, TerminalValuePolicy::RepricedPerRate);
        assert_relative_eq!(config.discount_rate, 0.10);
    }

    #[test]
    fn test_config_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ValuationConfig::from_json_file(&missing),
            Err(ModelError::Config(_))
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ years: ").unwrap();
        assert!(matches!(
            ValuationConfig::from_json_file(&broken),
            Err(ModelError::Config(_))
        ));
    }
}
