//! Command-line arguments.

use crate::error::CliError;
use clap::{Parser, ValueEnum};
use fairvalue::model::{TerminalValuePolicy, ValuationConfig};
use fairvalue::output::ReportFormat;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fairvalue")]
#[command(about = "Discounted cash flow valuation for a single ticker", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// Stock symbol (defaults to AAPL, or the ticker in --config)
    pub(crate) ticker: Option<String>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Annual revenue growth rate for the projection
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) growth_rate: Option<f64>,

    /// Discount rate for the headline valuation
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) discount_rate: Option<f64>,

    /// Perpetual growth rate for the terminal value
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) terminal_growth_rate: Option<f64>,

    /// Projection horizon in years
    #[arg(long)]
    pub(crate) years: Option<usize>,

    /// First discount rate of the sensitivity sweep
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) sweep_start: Option<f64>,

    /// Last discount rate of the sensitivity sweep
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) sweep_end: Option<f64>,

    /// Number of discount rates in the sweep
    #[arg(long)]
    pub(crate) sweep_points: Option<usize>,

    /// Recompute the terminal value at every swept rate
    #[arg(long)]
    pub(crate) reprice_terminal_value: bool,

    /// Years of price history to fetch
    #[arg(long)]
    pub(crate) history_years: Option<u32>,

    /// Where statements come from
    #[arg(long, value_enum, default_value_t = Source::Yahoo)]
    pub(crate) source: Source,

    /// Snapshot file for --source snapshot
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,

    /// Also write chart data as CSV files into this directory
    #[arg(long)]
    pub(crate) chart_dir: Option<PathBuf>,

    /// Skip charts entirely
    #[arg(long)]
    pub(crate) no_charts: bool,
}

/// Statement source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Source {
    /// Yahoo Finance fundamentals and quotes
    Yahoo,
    /// SEC EDGAR company facts
    Edgar,
    /// Local JSON snapshot
    Snapshot,
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Plain text tables for the terminal.
    Text,
    /// Markdown tables.
    Markdown,
    /// Single JSON object; terminal charts are suppressed.
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Markdown => Self::Markdown,
            OutputFormat::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Configuration file (or defaults) with flag overrides applied.
    pub(crate) fn valuation_config(&self) -> Result<ValuationConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ValuationConfig::from_json_file(path)?,
            None => ValuationConfig::default(),
        };

        if let Some(ticker) = &self.ticker {
            config.ticker = ticker.clone();
        }
        config.ticker = config.ticker.trim().to_uppercase();

        if let Some(v) = self.growth_rate {
            config.growth_rate = v;
        }
        if let Some(v) = self.discount_rate {
            config.discount_rate = v;
        }
        if let Some(v) = self.terminal_growth_rate {
            config.terminal_growth_rate = v;
        }
        if let Some(v) = self.years {
            config.years = v;
        }
        if let Some(v) = self.sweep_start {
            config.sweep.start = v;
        }
        if let Some(v) = self.sweep_end {
            config.sweep.end = v;
        }
        if let Some(v) = self.sweep_points {
            config.sweep.points = v;
        }
        if let Some(v) = self.history_years {
            config.history_years = v;
        }
        if self.reprice_terminal_value {
            config.terminal_value_policy = TerminalValuePolicy::RepricedPerRate;
        }

        Ok(config)
    }

    /// Whether terminal charts go to stdout alongside the report.
    pub(crate) fn ascii_charts(&self) -> bool {
        !self.no_charts && self.format != OutputFormat::Json
    }

    /// Directory for CSV chart data, unless charts are disabled.
    pub(crate) fn csv_chart_dir(&self) -> Option<&PathBuf> {
        self.chart_dir.as_ref().filter(|_| !self.no_charts)
    }
}
