//! Validation utilities for loaded and fetched candles.

use charter_core::Candle;

/// Validate a candle has reasonable values.
///
/// Prices must be finite and positive, the range must contain open and close,
/// and volume must be non-negative.
pub fn validate_candle(candle: &Candle) -> bool {
    candle.open.is_finite()
        && candle.high.is_finite()
        && candle.low.is_finite()
        && candle.close.is_finite()
        && candle.volume.is_finite()
        && candle.open > 0.0
        && candle.close > 0.0
        && candle.low > 0.0
        && candle.volume >= 0.0
        && candle.is_consistent()
}

/// Splits a batch into valid candles and the number rejected.
pub fn retain_valid(candles: Vec<Candle>) -> (Vec<Candle>, usize) {
    let before = candles.len();
    let valid: Vec<Candle> = candles.into_iter().filter(validate_candle).collect();
    let rejected = before - valid.len();
    (valid, rejected)
}

/// Index of the first candle that fails [`validate_candle`].
pub fn first_invalid(candles: &[Candle]) -> Option<usize> {
    candles.iter().position(|c| !validate_candle(c))
}
