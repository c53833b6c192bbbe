#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fairvalue/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chart;
pub mod format;
pub mod report;

pub use chart::{
    AsciiChartRenderer, ChartError, ChartRenderer, ChartSeries, CsvChartRenderer, LineChart,
    projection_chart, sensitivity_chart,
};
pub use format::{format_compact, format_currency, format_percent, format_ratio};
pub use report::{ReportBuilder, ReportError, ReportFormat, ValuationReport};
