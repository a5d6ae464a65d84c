//! Candle data structures for OHLCV data.

use serde::{Deserialize, Serialize};

/// OHLCV candle. `time` is the left edge of the bin in seconds since epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Checks `low <= min(open, close) <= max(open, close) <= high`.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }

    /// Maps the four prices through `log10`, leaving time and volume untouched.
    ///
    /// Non-positive prices become NaN rather than `-inf`, so they stay visible as
    /// gaps instead of stretching a log axis.
    pub fn log10(&self) -> Self {
        Self {
            time: self.time,
            open: log10_or_nan(self.open),
            high: log10_or_nan(self.high),
            low: log10_or_nan(self.low),
            close: log10_or_nan(self.close),
            volume: self.volume,
        }
    }

    /// Whether the close is at or above the open.
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

fn log10_or_nan(value: f64) -> f64 {
    if value > 0.0 {
        value.log10()
    } else {
        f64::NAN
    }
}

/// Trait for types that provide OHLCV data.
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency() {
        assert!(Candle::new(0, 10.0, 12.0, 9.0, 11.0, 1.0).is_consistent());
        assert!(!Candle::new(0, 10.0, 10.5, 9.0, 11.0, 1.0).is_consistent());
        assert!(!Candle::new(0, 10.0, 12.0, 10.5, 11.0, 1.0).is_consistent());
    }

    #[test]
    fn test_log10_keeps_time_and_volume() {
        let log = Candle::new(60, 10.0, 100.0, 1.0, 1000.0, 7.0).log10();
        assert_eq!(log.time, 60);
        assert_eq!(log.volume, 7.0);
        assert_eq!(log.open, 1.0);
        assert_eq!(log.high, 2.0);
        assert_eq!(log.low, 0.0);
        assert_eq!(log.close, 3.0);
    }

    #[test]
    fn test_log10_non_positive_is_nan() {
        let log = Candle::new(0, 0.0, 1.0, -1.0, 1.0, 0.0).log10();
        assert!(log.open.is_nan());
        assert!(log.low.is_nan());
        assert_eq!(log.high, 0.0);
    }
}
