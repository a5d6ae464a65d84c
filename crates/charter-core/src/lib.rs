//! Core types for the charter engine.
//!
//! This crate provides the data model and the pure algorithms built on it:
//! - `Candle` - OHLCV candle data
//! - `Resolution` - Bin widths with canonical durations and alignment
//! - `FrequencyLadder` - Ordered display resolutions
//! - `Series` / `SeriesStore` - Raw candles and resampling

pub mod candle;
pub mod error;
pub mod ladder;
pub mod resample;
pub mod series;
pub mod store;
pub mod timeframe;

pub use candle::{Candle, OHLCV};
pub use error::{CoreError, Result};
pub use ladder::{Direction, FrequencyLadder};
pub use resample::aggregate_candles;
pub use series::{Bounds, MergeOutcome, Series};
pub use store::{AppendOutcome, SeriesStore};
pub use timeframe::{Resolution, TimeUnit, REFERENCE_INSTANT};
