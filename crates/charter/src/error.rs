//! Error type for chart operations.

use charter_core::CoreError;
use charter_data::DataError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChartError>;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A live update could not be fetched; the chart keeps its old data.
    #[error("live update failed: {0}")]
    UpdateFailed(#[from] DataError),

    #[error("failed to load chart data: {0:#}")]
    Source(#[from] anyhow::Error),

    #[error("live updates need a symbol")]
    MissingSymbol,

    #[error("no chart registered under {0:?}")]
    UnknownChart(String),
}
