//! Errors surfaced by the command-line interface.

use fairvalue::data::DataError;
use fairvalue::model::ModelError;
use fairvalue::output::{ChartError, ReportError};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Fetching statements or prices failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A model stage or the configuration failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Report rendering failed.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Chart rendering failed.
    #[error(transparent)]
    Chart(#[from] ChartError),

    /// Writing to stdout failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `--source snapshot` without a file.
    #[error("--source snapshot requires --snapshot <PATH>")]
    MissingSnapshotPath,
}
