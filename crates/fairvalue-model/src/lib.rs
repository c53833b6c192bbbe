#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fairvalue/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dcf;
pub mod error;
pub mod projection;
pub mod ratios;
pub mod sensitivity;

pub use config::{SweepConfig, ValuationConfig};
pub use dcf::{ValuationResult, dcf_valuation, fcf_to_net_income_ratio};
pub use error::{ModelError, Result};
pub use projection::{ProjectionResult, project_financials};
pub use ratios::{RatioSet, compute_ratios};
pub use sensitivity::{
    SensitivityPoint, SensitivityResult, TerminalValuePolicy, linspace, sensitivity_analysis,
};
