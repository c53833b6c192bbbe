//! Valuation report generation.

use crate::format::{format_currency, format_percent, format_ratio};
use chrono::{DateTime, NaiveDate, Utc};
use fairvalue_model::{
    ProjectionResult, RatioSet, SensitivityResult, TerminalValuePolicy, ValuationResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A section was never supplied to the builder.
    #[error("Report is missing its {0} section")]
    MissingSection(&'static str),
}

/// Output format for a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Plain text for the terminal.
    #[default]
    Text,
    /// Markdown tables.
    Markdown,
    /// Pretty-printed JSON.
    Json,
}

/// Everything printed for one valuation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationReport {
    /// Ticker symbol.
    pub symbol: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Most recent closing price, when price history is available.
    pub last_close: Option<f64>,

    /// Margin and leverage ratios.
    pub ratios: RatioSet,

    /// Label for each projected period.
    pub projection_labels: Vec<String>,

    /// Projected revenue and net income.
    pub projection: ProjectionResult,

    /// Revenue growth rate used for the projection.
    pub growth_rate: f64,

    /// Free cash flow to net income ratio from the latest period.
    pub fcf_to_net_income_ratio: f64,

    /// Headline valuation.
    pub valuation: ValuationResult,

    /// Discount rate sweep.
    pub sensitivity: SensitivityResult,
}

impl ValuationReport {
    /// Render in the requested format.
    pub fn render(&self, format: ReportFormat) -> Result<String, ReportError> {
        match format {
            ReportFormat::Text => Ok(self.to_ascii_table()),
            ReportFormat::Markdown => Ok(self.to_markdown()),
            ReportFormat::Json => self.to_json(),
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One line per sweep point.
    pub fn sensitivity_lines(&self) -> Vec<String> {
        self.sensitivity
            .iter()
            .map(|p| {
                format!(
                    "Enterprise Value at {} discount rate: {}",
                    format_percent(p.discount_rate),
                    format_currency(p.enterprise_value)
                )
            })
            .collect()
    }

    fn sensitivity_caption(&self) -> String {
        match self.sensitivity.policy {
            TerminalValuePolicy::FixedAtFirstRate => {
                let first = self.sensitivity.points.first().map(|p| p.discount_rate);
                format!(
                    "terminal value priced at {}",
                    first.map_or_else(|| "n/a".to_string(), format_percent)
                )
            }
            TerminalValuePolicy::RepricedPerRate => "terminal value repriced per rate".to_string(),
        }
    }

    /// Ratio rows over the union of income and balance sheet periods.
    fn ratio_rows(&self) -> Vec<(NaiveDate, [String; 4])> {
        let periods: BTreeSet<NaiveDate> = self
            .ratios
            .iter()
            .flat_map(|(_, s)| s.periods().iter().copied())
            .collect();

        periods
            .into_iter()
            .map(|period| {
                let lookup = |series: &fairvalue_data::FinancialSeries| {
                    series
                        .iter()
                        .find(|(p, _)| *p == period)
                        .map_or(f64::NAN, |(_, v)| v)
                };
                (
                    period,
                    [
                        format_percent(lookup(&self.ratios.gross_margin)),
                        format_percent(lookup(&self.ratios.operating_margin)),
                        format_percent(lookup(&self.ratios.net_profit_margin)),
                        format_ratio(lookup(&self.ratios.debt_to_equity)),
                    ],
                )
            })
            .collect()
    }

    fn projection_rows(&self) -> impl Iterator<Item = (&str, f64, f64)> {
        self.projection_labels
            .iter()
            .map(String::as_str)
            .zip(&self.projection.revenue)
            .zip(&self.projection.net_income)
            .map(|((label, rev), ni)| (label, *rev, *ni))
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();
        let v = &self.valuation;

        output.push_str(&format!("\nValuation Report: {}\n", self.symbol));
        output.push_str(&format!(
            "Generated: {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if let Some(close) = self.last_close {
            output.push_str(&format!("Last Close: {}\n", format_currency(close)));
        }
        output.push_str(&"=".repeat(80));
        output.push('\n');

        output.push_str("\nFinancial Ratios:\n");
        output.push_str(&"-".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "{:<12} {:>16} {:>16} {:>18} {:>14}\n",
            "Period", "Gross Margin", "Operating Margin", "Net Profit Margin", "Debt/Equity"
        ));
        for (period, [gross, operating, net, leverage]) in self.ratio_rows() {
            output.push_str(&format!(
                "{:<12} {:>16} {:>16} {:>18} {:>14}\n",
                period.to_string(),
                gross,
                operating,
                net,
                leverage
            ));
        }

        output.push_str(&format!(
            "\nProjections ({} revenue growth):\n",
            format_percent(self.growth_rate)
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "{:<12} {:>22} {:>22}\n",
            "Year", "Revenue", "Net Income"
        ));
        for (label, revenue, net_income) in self.projection_rows() {
            output.push_str(&format!(
                "{:<12} {:>22} {:>22}\n",
                label,
                format_currency(revenue),
                format_currency(net_income)
            ));
        }

        output.push_str("\nDiscounted Cash Flow:\n");
        output.push_str(&"-".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "  Discount Rate:             {}\n",
            format_percent(v.discount_rate)
        ));
        output.push_str(&format!(
            "  Terminal Growth Rate:      {}\n",
            format_percent(v.terminal_growth_rate)
        ));
        output.push_str(&format!(
            "  FCF / Net Income:          {}\n",
            format_ratio(self.fcf_to_net_income_ratio)
        ));
        output.push_str(&format!(
            "  PV of Free Cash Flows:     {}\n",
            format_currency(v.present_value_of_cash_flows())
        ));
        output.push_str(&format!(
            "  Terminal Value:            {}\n",
            format_currency(v.terminal_value)
        ));
        output.push_str(&format!(
            "  PV of Terminal Value:      {}\n",
            format_currency(v.discounted_terminal_value)
        ));
        output.push_str(&format!(
            "  Enterprise Value:          {}\n",
            format_currency(v.enterprise_value)
        ));

        output.push_str(&format!(
            "\nSensitivity Analysis ({}):\n",
            self.sensitivity_caption()
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        for line in self.sensitivity_lines() {
            output.push_str(&line);
            output.push('\n');
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        let v = &self.valuation;

        output.push_str(&format!("# Valuation Report: {}\n\n", self.symbol));
        output.push_str(&format!(
            "**Generated:** {}\n\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if let Some(close) = self.last_close {
            output.push_str(&format!("**Last Close:** {}\n\n", format_currency(close)));
        }

        output.push_str("## Financial Ratios\n\n");
        output.push_str("| Period | Gross Margin | Operating Margin | Net Profit Margin | Debt/Equity |\n");
        output.push_str("|--------|--------------|------------------|-------------------|-------------|\n");
        for (period, [gross, operating, net, leverage]) in self.ratio_rows() {
            output.push_str(&format!(
                "| {period} | {gross} | {operating} | {net} | {leverage} |\n"
            ));
        }

        output.push_str(&format!(
            "\n## Projections\n\nRevenue growth: {}\n\n",
            format_percent(self.growth_rate)
        ));
        output.push_str("| Year | Revenue | Net Income |\n");
        output.push_str("|------|---------|------------|\n");
        for (label, revenue, net_income) in self.projection_rows() {
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                label,
                format_currency(revenue),
                format_currency(net_income)
            ));
        }

        output.push_str("\n## Discounted Cash Flow\n\n");
        output.push_str(&format!(
            "- **Discount Rate:** {}\n",
            format_percent(v.discount_rate)
        ));
        output.push_str(&format!(
            "- **Terminal Growth Rate:** {}\n",
            format_percent(v.terminal_growth_rate)
        ));
        output.push_str(&format!(
            "- **FCF / Net Income:** {}\n",
            format_ratio(self.fcf_to_net_income_ratio)
        ));
        output.push_str(&format!(
            "- **PV of Free Cash Flows:** {}\n",
            format_currency(v.present_value_of_cash_flows())
        ));
        output.push_str(&format!(
            "- **Terminal Value:** {}\n",
            format_currency(v.terminal_value)
        ));
        output.push_str(&format!(
            "- **PV of Terminal Value:** {}\n",
            format_currency(v.discounted_terminal_value)
        ));
        output.push_str(&format!(
            "- **Enterprise Value:** {}\n\n",
            format_currency(v.enterprise_value)
        ));

        output.push_str(&format!(
            "## Sensitivity Analysis\n\n_{}_\n\n",
            self.sensitivity_caption()
        ));
        output.push_str("| Discount Rate | Enterprise Value |\n");
        output.push_str("|---------------|------------------|\n");
        for point in self.sensitivity.iter() {
            output.push_str(&format!(
                "| {} | {} |\n",
                format_percent(point.discount_rate),
                format_currency(point.enterprise_value)
            ));
        }

        output
    }
}

impl fmt::Display for ValuationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Valuation: {}", self.symbol)?;
        writeln!(
            f,
            "  Enterprise Value: {}",
            format_currency(self.valuation.enterprise_value)
        )?;
        for line in self.sensitivity_lines() {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    symbol: Option<String>,
    last_close: Option<f64>,
    ratios: Option<RatioSet>,
    projection_labels: Vec<String>,
    projection: Option<ProjectionResult>,
    growth_rate: Option<f64>,
    fcf_to_net_income_ratio: Option<f64>,
    valuation: Option<ValuationResult>,
    sensitivity: Option<SensitivityResult>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the symbol.
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Set the last closing price.
    pub const fn last_close(mut self, close: Option<f64>) -> Self {
        self.last_close = close;
        self
    }

    /// Set the ratios.
    pub fn ratios(mut self, ratios: RatioSet) -> Self {
        self.ratios = Some(ratios);
        self
    }

    /// Set the projection, its period labels and the growth rate behind it.
    pub fn projection(
        mut self,
        labels: Vec<String>,
        projection: ProjectionResult,
        growth_rate: f64,
    ) -> Self {
        self.projection_labels = labels;
        self.projection = Some(projection);
        self.growth_rate = Some(growth_rate);
        self
    }

    /// Set the headline valuation and the FCF ratio it used.
    pub fn valuation(mut self, valuation: ValuationResult, fcf_to_net_income_ratio: f64) -> Self {
        self.valuation = Some(valuation);
        self.fcf_to_net_income_ratio = Some(fcf_to_net_income_ratio);
        self
    }

    /// Set the sensitivity sweep.
    pub fn sensitivity(mut self, sensitivity: SensitivityResult) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<ValuationReport, ReportError> {
        let projection = self
            .projection
            .ok_or(ReportError::MissingSection("projection"))?;
        let mut labels = self.projection_labels;
        if labels.len() != projection.years() {
            labels = (1..=projection.years()).map(|i| format!("Year {i}")).collect();
        }

        Ok(ValuationReport {
            symbol: self.symbol.unwrap_or_default(),
            timestamp: Utc::now(),
            last_close: self.last_close,
            ratios: self.ratios.ok_or(ReportError::MissingSection("ratios"))?,
            projection_labels: labels,
            projection,
            growth_rate: self.growth_rate.unwrap_or(f64::NAN),
            fcf_to_net_income_ratio: self.fcf_to_net_income_ratio.unwrap_or(f64::NAN),
            valuation: self
                .valuation
                .ok_or(ReportError::MissingSection("valuation"))?,
            sensitivity: self
                .sensitivity
                .ok_or(ReportError::MissingSection("sensitivity"))?,
        })
    }
}
