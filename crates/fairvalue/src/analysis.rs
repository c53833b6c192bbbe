//! The valuation pipeline over one company's data.

use chrono::Datelike;
use fairvalue_data::{CompanyData, line_items};
use fairvalue_model::{
    ModelError, ProjectionResult, RatioSet, Result, SensitivityResult, ValuationConfig,
    ValuationResult, compute_ratios, dcf_valuation, fcf_to_net_income_ratio, project_financials,
    sensitivity_analysis,
};
use fairvalue_output::{
    ChartError, LineChart, ReportBuilder, ReportError, ValuationReport, projection_chart,
    sensitivity_chart,
};
use serde::Serialize;
use tracing::{debug, info};

/// Every intermediate result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Ticker symbol
    pub symbol: String,
    /// Configuration the run used
    pub config: ValuationConfig,
    /// Most recent closing price, if any
    pub last_close: Option<f64>,
    /// Margin and leverage ratios
    pub ratios: RatioSet,
    /// Latest reported revenue, the base of the projection
    pub initial_revenue: f64,
    /// Latest net profit margin, held constant over the projection
    pub terminal_net_profit_margin: f64,
    /// Fiscal year label of each projected period
    pub projection_labels: Vec<String>,
    /// Projected revenue and net income
    pub projection: ProjectionResult,
    /// Latest free cash flow over latest net income
    pub fcf_to_net_income_ratio: f64,
    /// Valuation at the configured discount rate
    pub valuation: ValuationResult,
    /// Valuation across the configured sweep
    pub sensitivity: SensitivityResult,
}

impl Analysis {
    /// Assemble the printable report.
    pub fn report(&self) -> std::result::Result<ValuationReport, ReportError> {
        ReportBuilder::new()
            .symbol(self.symbol.as_str())
            .last_close(self.last_close)
            .ratios(self.ratios.clone())
            .projection(
                self.projection_labels.clone(),
                self.projection.clone(),
                self.config.growth_rate,
            )
            .valuation(self.valuation.clone(), self.fcf_to_net_income_ratio)
            .sensitivity(self.sensitivity.clone())
            .build()
    }

    /// The projection chart followed by the sensitivity chart.
    pub fn charts(&self) -> std::result::Result<Vec<LineChart>, ChartError> {
        Ok(vec![
            projection_chart(&self.projection_labels, &self.projection)?,
            sensitivity_chart(&self.sensitivity)?,
        ])
    }
}

/// Run ratios, projection, DCF and the sweep in order.
///
/// The configuration is validated before any data is touched and the first
/// failing stage aborts the run.
pub fn run_analysis(data: &CompanyData, config: &ValuationConfig) -> Result<Analysis> {
    config.validate()?;
    info!(symbol = %data.symbol, "running valuation");

    let ratios = compute_ratios(&data.income_statement, &data.balance_sheet)?;
    debug!(periods = data.income_statement.len(), "computed ratios");

    let revenue = data.income_statement.series(line_items::TOTAL_REVENUE)?;
    let (latest_period, _) = revenue.latest().ok_or_else(|| {
        ModelError::EmptyStatement(data.income_statement.kind().to_string())
    })?;
    let Some((initial_revenue, terminal_net_profit_margin)) = revenue
        .latest_finite()
        .zip(ratios.net_profit_margin.latest_finite())
    else {
        return Err(ModelError::MissingData(format!(
            "{} revenue or net profit margin for {latest_period} is not usable",
            data.symbol
        )));
    };

    let projection = project_financials(
        initial_revenue,
        terminal_net_profit_margin,
        config.growth_rate,
        config.years,
    )?;
    let projection_labels = (1..=config.years)
        .map(|i| (i64::from(latest_period.year()) + i as i64).to_string())
        .collect();
    info!(
        initial_revenue,
        margin = terminal_net_profit_margin,
        years = config.years,
        "projected financials"
    );

    let ratio = fcf_to_net_income_ratio(&data.cash_flow, &data.income_statement)?;
    let valuation = dcf_valuation(
        &projection.net_income,
        ratio,
        config.discount_rate,
        config.terminal_growth_rate,
    )?;
    info!(
        enterprise_value = valuation.enterprise_value,
        discount_rate = config.discount_rate,
        "valued enterprise"
    );

    let sensitivity = sensitivity_analysis(
        &projection.net_income,
        ratio,
        &config.sweep_rates(),
        config.terminal_growth_rate,
        config.terminal_value_policy,
    )?;
    info!(points = sensitivity.len(), "ran sensitivity sweep");

    Ok(Analysis {
        symbol: data.symbol.clone(),
        config: config.clone(),
        last_close: data.last_close(),
        ratios,
        initial_revenue,
        terminal_net_profit_margin,
        projection_labels,
        projection,
        fcf_to_net_income_ratio: ratio,
        valuation,
        sensitivity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use fairvalue_data::{StatementKind, StatementTable};
    use polars::prelude::DataFrame;
    use std::collections::BTreeMap;

    fn table(kind: StatementKind, items: &[(&str, f64)]) -> StatementTable {
        let period = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let obs: BTreeMap<String, BTreeMap<NaiveDate, f64>> = items
            .iter()
            .map(|(name, v)| ((*name).to_string(), BTreeMap::from([(period, *v)])))
            .collect();
        StatementTable::from_observations(kind, &obs).unwrap()
    }

    fn company(net_income: f64) -> CompanyData {
        company_with_revenue(1000.0, net_income)
    }

    fn company_with_revenue(revenue: f64, net_income: f64) -> CompanyData {
        CompanyData {
            symbol: "ACME".to_string(),
            income_statement: table(
                StatementKind::Income,
                &[
                    (line_items::TOTAL_REVENUE, revenue),
                    (line_items::GROSS_PROFIT, 450.0),
                    (line_items::OPERATING_INCOME, 250.0),
                    (line_items::NET_INCOME, net_income),
                ],
            ),
            balance_sheet: table(
                StatementKind::BalanceSheet,
                &[
                    (line_items::TOTAL_LIABILITIES, 500.0),
                    (line_items::TOTAL_STOCKHOLDER_EQUITY, 500.0),
                ],
            ),
            cash_flow: table(StatementKind::CashFlow, &[(line_items::FREE_CASH_FLOW, 200.0)]),
            prices: DataFrame::empty(),
        }
    }

    #[test]
    fn test_labels_follow_latest_fiscal_year() {
        let config = ValuationConfig {
            ticker: "ACME".into(),
            years: 3,
            ..Default::default()
        };
        let analysis = run_analysis(&company(200.0), &config).unwrap();
        assert_eq!(analysis.projection_labels, vec!["2024", "2025", "2026"]);
        assert_relative_eq!(analysis.valuation.enterprise_value, 31_500.0 / 11.0, max_relative = 1e-6);
        assert!(analysis.last_close.is_none());
    }

    #[test]
    fn test_invalid_config_stops_before_data() {
        let config = ValuationConfig {
            discount_rate: 0.01,
            ..Default::default()
        };
        let err = run_analysis(&company(200.0), &config).unwrap_err();
        assert!(matches!(err, ModelError::InvalidRateRelationship { .. }));
    }

    #[test]
    fn test_unusable_margin() {
        let err = run_analysis(&company(f64::NAN), &ValuationConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::MissingData(_)));
    }

    #[test]
    fn test_report_and_charts() {
        let analysis = run_analysis(&company(200.0), &ValuationConfig::default()).unwrap();
        let report = analysis.report().unwrap();
        assert_eq!(report.projection_labels.len(), 5);
        assert_eq!(analysis.charts().unwrap().len(), 2);
    }

    #[test]
    fn test_unusable_revenue() {
        let err = run_analysis(&company_with_revenue(f64::INFINITY, 200.0), &ValuationConfig::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingData(msg) if msg.contains("2023-12-31")));
    }
}
