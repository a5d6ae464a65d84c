//! Errors raised by loaders and live-update sources.

use charter_core::Resolution;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed kline at index {index}: {reason}")]
    MalformedKline { index: usize, reason: String },
    #[error("exchange rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("no exchange interval for resolution {0}")]
    UnsupportedInterval(Resolution),
}
