//! fairvalue CLI binary.
//!
//! Fetches one company's statements, values it with a discounted cash flow
//! model and prints the report followed by the projection and sensitivity
//! charts.

mod cli;
mod error;

use clap::Parser;
use cli::{Cli, Source};
use error::CliError;
use fairvalue::analysis::{Analysis, run_analysis};
use fairvalue::data::{
    CompanyData, EdgarStatementProvider, SnapshotProvider, StatementProvider,
    YahooStatementProvider,
};
use fairvalue::output::{AsciiChartRenderer, ChartRenderer, CsvChartRenderer};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::process;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.valuation_config()?;
    config.validate()?;

    let data = match cli.source {
        Source::Yahoo => {
            let provider = YahooStatementProvider::new(config.history_years)?;
            fetch(&provider, &config.ticker).await?
        }
        Source::Edgar => {
            let provider = EdgarStatementProvider::new(config.history_years)?;
            fetch(&provider, &config.ticker).await?
        }
        Source::Snapshot => {
            let path = cli.snapshot.clone().ok_or(CliError::MissingSnapshotPath)?;
            fetch(&SnapshotProvider::new(path), &config.ticker).await?
        }
    };

    let analysis = run_analysis(&data, &config)?;
    let report = analysis.report()?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", report.render(cli.format.into())?)?;
    render_charts(&cli, &analysis, &mut stdout)?;
    Ok(())
}

/// Fetch company data behind a spinner on stderr.
async fn fetch<P: StatementProvider>(provider: &P, symbol: &str) -> Result<CompanyData, CliError> {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Fetching {symbol} from {}...", provider.name()));

    match provider.fetch_company_data(symbol).await {
        Ok(data) => {
            pb.finish_and_clear();
            info!(
                symbol,
                source = provider.name(),
                income_periods = data.income_statement.len(),
                price_rows = data.prices.height(),
                "fetched company data"
            );
            Ok(data)
        }
        Err(e) => {
            pb.finish_and_clear();
            Err(e.into())
        }
    }
}

fn render_charts(cli: &Cli, analysis: &Analysis, out: &mut impl Write) -> Result<(), CliError> {
    let charts = analysis.charts()?;

    if cli.ascii_charts() {
        let mut renderer = AsciiChartRenderer::new(&mut *out);
        for chart in &charts {
            renderer.render(chart)?;
        }
    }

    if let Some(dir) = cli.csv_chart_dir() {
        let mut renderer = CsvChartRenderer::new(dir);
        for chart in &charts {
            renderer.render(chart)?;
        }
        for path in renderer.written() {
            info!(path = %path.display(), "wrote chart data");
        }
    }

    Ok(())
}
