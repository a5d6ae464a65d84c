//! Error types for the core data model.

use thiserror::Error;

use crate::timeframe::Resolution;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by ladders, series and resampling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Resampling target is finer than the native resolution of the data.
    #[error("cannot resample {native} data to finer resolution {target}")]
    IncompatibleResolution {
        native: Resolution,
        target: Resolution,
    },

    /// A custom resolution has no unique rank on the ladder.
    #[error("resolution {0} has no unique position on the ladder")]
    AmbiguousResolution(Resolution),

    /// Stepping along the ladder would leave it.
    #[error("cannot step {steps} rung(s) {direction} from {from}: ladder boundary")]
    LadderBoundary {
        from: Resolution,
        direction: &'static str,
        steps: usize,
    },

    /// An abrupt re-target would need a resolution coarser than the ladder offers.
    #[error("viewport of {span_secs}s needs {steps} step(s) above {from}; are we looking at over 800 years of data?")]
    RangeTooLarge {
        from: Resolution,
        steps: usize,
        span_secs: i64,
    },

    /// The resolution is not a rung of the ladder.
    #[error("resolution {0} is not on the ladder")]
    UnknownResolution(Resolution),

    /// A resolution tag could not be parsed.
    #[error("invalid resolution tag {0:?}")]
    InvalidResolution(String),

    /// Ladder rungs are not strictly increasing by duration.
    #[error("ladder is not strictly increasing at {0}")]
    UnorderedLadder(Resolution),

    /// Candle times are not strictly increasing.
    #[error("series times not strictly increasing at t={0}")]
    UnsortedSeries(i64),

    /// The operation needs at least one candle.
    #[error("series is empty")]
    EmptySeries,

    /// Viewport interval with `start >= end`.
    #[error("invalid interval [{start}, {end}]")]
    InvalidInterval { start: i64, end: i64 },
}
