//! Line charts for projections and the discount rate sweep.
//!
//! A [`LineChart`] is plain data: a title, axis labels, one label per x
//! position and any number of series aligned with those positions. Renderers
//! decide how to present it. [`AsciiChartRenderer`] draws with ratatui into any
//! [`io::Write`](std::io::Write) and [`CsvChartRenderer`] writes the chart's data to
//! `<dir>/<title_slug>.csv`.

use crate::format::{format_compact, format_percent};
use fairvalue_model::{ProjectionResult, SensitivityResult};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Rect};
use ratatui::symbols::Marker;
use ratatui::text::Line;
use ratatui::widgets::{
    Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Widget,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Projection chart title.
pub const PROJECTION_TITLE: &str = "Revenue and Net Income Projections";
/// Sensitivity chart title.
pub const SENSITIVITY_TITLE: &str = "Sensitivity of Enterprise Value to Discount Rate";

/// Errors that can occur while rendering charts.
#[derive(Debug, Error)]
pub enum ChartError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// A series does not line up with the x positions.
    #[error("Series '{series}' has {found} values for {expected} x positions")]
    LengthMismatch {
        /// Series name
        series: String,
        /// Number of x positions
        expected: usize,
        /// Number of values supplied
        found: usize,
    },
}

/// One named line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    /// Legend entry
    pub name: String,
    /// One value per x position
    pub values: Vec<f64>,
}

/// A line chart over labelled x positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChart {
    /// Chart title
    pub title: String,
    /// X axis label
    pub x_label: String,
    /// Y axis label
    pub y_label: String,
    /// Label of each x position
    pub x: Vec<String>,
    /// Plotted series
    pub series: Vec<ChartSeries>,
}

impl LineChart {
    /// Create a chart with no series.
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        x: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            x,
            series: Vec::new(),
        }
    }

    /// Add a series; it must have one value per x position.
    pub fn with_series(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, ChartError> {
        let name = name.into();
        if values.len() != self.x.len() {
            return Err(ChartError::LengthMismatch {
                series: name,
                expected: self.x.len(),
                found: values.len(),
            });
        }
        self.series.push(ChartSeries { name, values });
        Ok(self)
    }

    /// File name stem derived from the title, e.g. `revenue_and_net_income_projections`.
    pub fn file_stem(&self) -> String {
        let mut stem = String::with_capacity(self.title.len());
        for ch in self.title.chars() {
            if ch.is_ascii_alphanumeric() {
                stem.push(ch.to_ascii_lowercase());
            } else if !stem.is_empty() && !stem.ends_with('_') {
                stem.push('_');
            }
        }
        stem.trim_end_matches('_').to_string()
    }

    fn value_range(&self) -> Option<(f64, f64)> {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Projected revenue and net income per period.
pub fn projection_chart(labels: &[String], projection: &ProjectionResult) -> Result<LineChart, ChartError> {
    LineChart::new(PROJECTION_TITLE, "Year", "Amount ($)", labels.to_vec())
        .with_series("Revenue Projections", projection.revenue.clone())?
        .with_series("Net Income Projections", projection.net_income.clone())
}

/// Enterprise value per swept discount rate.
pub fn sensitivity_chart(sensitivity: &SensitivityResult) -> Result<LineChart, ChartError> {
    let x = sensitivity
        .iter()
        .map(|p| format_percent(p.discount_rate))
        .collect();
    LineChart::new(SENSITIVITY_TITLE, "Discount Rate", "Enterprise Value ($)", x)
        .with_series("Enterprise Value", sensitivity.enterprise_values())
}

/// Presents a [`LineChart`].
pub trait ChartRenderer {
    /// Render one chart.
    fn render(&mut self, chart: &LineChart) -> Result<(), ChartError>;
}

/// Marker and the glyph it draws, cycled per series.
const MARKERS: [(Marker, &str); 4] = [
    (Marker::Dot, "•"),
    (Marker::Block, "█"),
    (Marker::Braille, "⣿"),
    (Marker::Bar, "▄"),
];

/// Draws charts as text through ratatui's [`Chart`] widget.
///
/// The widget renders into an off-screen [`Buffer`] whose rows are then
/// written out line by line, so no terminal is required.
#[derive(Debug)]
pub struct AsciiChartRenderer<W> {
    writer: W,
    width: u16,
    height: u16,
}

impl<W: Write> AsciiChartRenderer<W> {
    /// Renderer with a 72 x 20 cell chart area.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            width: 72,
            height: 20,
        }
    }

    /// Override the chart area size.
    pub fn with_size(mut self, width: u16, height: u16) -> Self {
        self.width = width.max(20);
        self.height = height.max(8);
        self
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn draw(&self, chart: &LineChart) -> String {
        let mut out = format!("\n{}\n", chart.title);
        let Some((mut lo, mut hi)) = chart.value_range() else {
            out.push_str("  (no finite values to plot)\n");
            return out;
        };
        if hi <= lo {
            let pad = if hi == 0.0 { 1.0 } else { hi.abs() * 0.1 };
            lo -= pad;
            hi += pad;
        }

        let points: Vec<Vec<(f64, f64)>> = chart
            .series
            .iter()
            .map(|s| {
                s.values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(i, v)| (i as f64, *v))
                    .collect()
            })
            .collect();

        let datasets: Vec<Dataset<'_>> = chart
            .series
            .iter()
            .zip(&points)
            .enumerate()
            .map(|(k, (series, data))| {
                let (marker, glyph) = MARKERS[k % MARKERS.len()];
                Dataset::default()
                    .name(format!("{glyph} {}", series.name))
                    .marker(marker)
                    .graph_type(GraphType::Line)
                    .data(data)
            })
            .collect();

        let y_labels: Vec<Line<'_>> = [lo, (lo + hi) / 2.0, hi]
            .into_iter()
            .map(|v| Line::from(format_compact(v)))
            .collect();

        let chart_widget = Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL))
            .x_axis(
                Axis::default()
                    .title(chart.x_label.as_str())
                    .bounds([0.0, (chart.x.len().saturating_sub(1) as f64).max(1.0)])
                    .labels(x_tick_labels(&chart.x)),
            )
            .y_axis(
                Axis::default()
                    .title(chart.y_label.as_str())
                    .bounds([lo, hi])
                    .labels(y_labels),
            )
            .legend_position(Some(LegendPosition::TopLeft))
            .hidden_legend_constraints((Constraint::Ratio(1, 1), Constraint::Ratio(1, 1)));

        let area = Rect::new(0, 0, self.width, self.height);
        let mut buf = Buffer::empty(area);
        chart_widget.render(area, &mut buf);

        for row in buf.content().chunks(usize::from(area.width)) {
            let line: String = row.iter().map(|cell| cell.symbol()).collect();
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Every x label when they are few, otherwise the first, middle and last.
fn x_tick_labels(x: &[String]) -> Vec<Line<'_>> {
    if x.len() <= 7 {
        return x.iter().map(|l| Line::from(l.as_str())).collect();
    }
    [0, (x.len() - 1) / 2, x.len() - 1]
        .into_iter()
        .map(|i| Line::from(x[i].as_str()))
        .collect()
}

impl<W: Write> ChartRenderer for AsciiChartRenderer<W> {
    fn render(&mut self, chart: &LineChart) -> Result<(), ChartError> {
        let text = self.draw(chart);
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes each chart's data to a CSV file.
#[derive(Debug, Clone)]
pub struct CsvChartRenderer {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvChartRenderer {
    /// Renderer writing into `dir`, created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ChartRenderer for CsvChartRenderer {
    fn render(&mut self, chart: &LineChart) -> Result<(), ChartError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.csv", chart.file_stem()));

        let mut wtr = csv::Writer::from_path(&path)?;
        let mut header = vec![chart.x_label.as_str()];
        header.extend(chart.series.iter().map(|s| s.name.as_str()));
        wtr.write_record(&header)?;

        for (i, x) in chart.x.iter().enumerate() {
            let mut record = vec![x.clone()];
            record.extend(chart.series.iter().map(|s| {
                s.values
                    .get(i)
                    .filter(|v| v.is_finite())
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;

        debug!(path = %path.display(), title = %chart.title, "wrote chart data");
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairvalue_model::{TerminalValuePolicy, project_financials, sensitivity_analysis};

    fn labels() -> Vec<String> {
        (2024..=2028).map(|y| y.to_string()).collect()
    }

    fn projection() -> ProjectionResult {
        project_financials(1000.0, 0.2, 0.1, 5).unwrap()
    }

    #[test]
    fn test_projection_chart() {
        let chart = projection_chart(&labels(), &projection()).unwrap();
        assert_eq!(chart.title, PROJECTION_TITLE);
        assert_eq!(chart.y_label, "Amount ($)");
        assert_eq!(chart.series[0].name, "Revenue Projections");
        assert_eq!(chart.series[1].name, "Net Income Projections");
        assert_eq!(chart.file_stem(), "revenue_and_net_income_projections");
    }

    #[test]
    fn test_sensitivity_chart() {
        let sweep = sensitivity_analysis(
            &projection().net_income,
            1.0,
            &[0.08, 0.10, 0.12],
            0.02,
            TerminalValuePolicy::FixedAtFirstRate,
        )
        .unwrap();
        let chart = sensitivity_chart(&sweep).unwrap();
        assert_eq!(chart.x, vec!["8.00%", "10.00%", "12.00%"]);
        assert_eq!(chart.y_label, "Enterprise Value ($)");
        assert_eq!(
            chart.file_stem(),
            "sensitivity_of_enterprise_value_to_discount_rate"
        );
    }

    #[test]
    fn test_length_mismatch() {
        let err = LineChart::new("t", "x", "y", labels())
            .with_series("short", vec![1.0])
            .unwrap_err();
        assert!(matches!(err, ChartError::LengthMismatch { expected: 5, found: 1, .. }));
    }

    #[test]
    fn test_ascii_render() {
        let chart = projection_chart(&labels(), &projection()).unwrap();
        let mut renderer = AsciiChartRenderer::new(Vec::new()).with_size(72, 20);
        renderer.render(&chart).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(text.contains(PROJECTION_TITLE));
        assert!(text.contains("• Revenue Projections"));
        assert!(text.contains("█ Net Income Projections"));
        assert!(text.contains("2024"));
        assert!(text.contains("2028"));
        assert!(text.contains("1.46K"));
        assert!(text.contains("Amount ($)"));
        // Title line plus one line per buffer row
        assert_eq!(text.trim_start_matches('\n').lines().count(), 21);
    }

    #[test]
    fn test_ascii_render_without_finite_values() {
        let chart = LineChart::new("Empty", "x", "y", vec!["a".into()])
            .with_series("nan", vec![f64::NAN])
            .unwrap();
        let mut renderer = AsciiChartRenderer::new(Vec::new());
        renderer.render(&chart).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.contains("no finite values"));
    }

    #[test]
    fn test_ascii_render_flat_series() {
        let chart = LineChart::new("Flat", "x", "y", vec!["a".into(), "b".into()])
            .with_series("flat", vec![5.0, 5.0])
            .unwrap();
        let mut renderer = AsciiChartRenderer::new(Vec::new());
        assert!(renderer.render(&chart).is_ok());
    }

    #[test]
    fn test_many_x_labels_are_thinned() {
        let x: Vec<String> = (2024..2034).map(|y| y.to_string()).collect();
        let ticks = x_tick_labels(&x);
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[1], Line::from("2028"));
    }

    #[test]
    fn test_csv_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = CsvChartRenderer::new(dir.path().join("charts"));
        let chart = LineChart::new("Demo Chart", "Year", "Amount", vec!["2024".into(), "2025".into()])
            .with_series("Revenue", vec![100.0, f64::NAN])
            .unwrap();
        renderer.render(&chart).unwrap();

        assert_eq!(renderer.written().len(), 1);
        let body = std::fs::read_to_string(&renderer.written()[0]).unwrap();
        assert_eq!(body, "Year,Revenue\n2024,100\n2025,\n");
        assert!(renderer.written()[0].ends_with("demo_chart.csv"));
    }
}
