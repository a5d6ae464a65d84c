//! Owner of a chart's raw series at native resolution.

use crate::candle::Candle;
use crate::error::{CoreError, Result};
use crate::resample::aggregate_candles;
use crate::series::{Bounds, MergeOutcome, Series};
use crate::timeframe::Resolution;

/// Result of [`SeriesStore::append`].
///
/// A changed store invalidates every resampled series derived from it. The
/// store only signals this; callers own their caches and must clear them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub added: usize,
    pub replaced: usize,
}

impl AppendOutcome {
    pub fn invalidates_cache(&self) -> bool {
        self.added + self.replaced > 0
    }
}

impl From<MergeOutcome> for AppendOutcome {
    fn from(outcome: MergeOutcome) -> Self {
        Self {
            added: outcome.added,
            replaced: outcome.replaced,
        }
    }
}

/// Raw OHLC series plus resampling to coarser resolutions.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    raw: Series,
}

impl SeriesStore {
    pub fn new(raw: Series) -> Self {
        Self { raw }
    }

    /// Builds a store from time-sorted candles.
    pub fn from_candles(native: Resolution, candles: Vec<Candle>) -> Result<Self> {
        Series::new(native, candles).map(Self::new)
    }

    pub fn native(&self) -> Resolution {
        self.raw.resolution()
    }

    pub fn raw(&self) -> &Series {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Times of the first and last raw candle.
    pub fn absolute_bounds(&self) -> Option<Bounds> {
        self.raw.bounds()
    }

    pub fn last_time(&self) -> Option<i64> {
        self.raw.last().map(|c| c.time)
    }

    /// Aggregates the raw series into `resolution` bins.
    ///
    /// A resolution with the native duration returns the raw candles as-is.
    pub fn resample(&self, resolution: Resolution, cut_partial_bins: bool) -> Result<Series> {
        let native = self.native();
        let target = resolution.duration_seconds();
        if target < native.duration_seconds() {
            return Err(CoreError::IncompatibleResolution { native, target: resolution });
        }
        if target == native.duration_seconds() {
            return Ok(self.raw.clone().with_resolution(resolution));
        }
        let candles = aggregate_candles(self.raw.candles(), resolution, cut_partial_bins);
        log::trace!(
            "resampled {} {} candles into {} {} bins",
            self.raw.len(),
            native,
            candles.len(),
            resolution
        );
        Series::new(resolution, candles)
    }

    /// Merges a batch into the raw series.
    ///
    /// The batch may be unordered and may overlap the tail; duplicate times
    /// collapse to one candle. The merge happens in full or not at all.
    pub fn append(&mut self, batch: Vec<Candle>) -> AppendOutcome {
        self.raw.merge(batch).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(count: usize) -> SeriesStore {
        let candles = (0..count)
            .map(|i| {
                let p = 50.0 + (i % 7) as f64;
                Candle::new(60 * i as i64, p, p + 1.0, p - 1.0, p + 0.5, 2.0)
            })
            .collect();
        SeriesStore::from_candles(Resolution::minutes(1), candles).unwrap()
    }

    #[test]
    fn test_resample_rejects_finer_target() {
        let store = SeriesStore::from_candles(Resolution::hours(1), Vec::new()).unwrap();
        assert_eq!(
            store.resample(Resolution::minutes(5), false),
            Err(CoreError::IncompatibleResolution {
                native: Resolution::hours(1),
                target: Resolution::minutes(5),
            })
        );
    }

    #[test]
    fn test_resample_native_is_identity() {
        let store = store(10);
        let same = store.resample(Resolution::minutes(1), true).unwrap();
        assert_eq!(same.candles(), store.raw().candles());
    }

    #[test]
    fn test_resample_preserves_volume() {
        let store = store(120);
        let hourly = store.resample(Resolution::hours(1), false).unwrap();
        assert_eq!(hourly.len(), 2);
        let volume: f64 = hourly.candles().iter().map(|c| c.volume).sum();
        assert_eq!(volume, 240.0);
    }

    #[test]
    fn test_append_reports_invalidation() {
        let mut store = store(3);
        assert!(!store.append(Vec::new()).invalidates_cache());
        let outcome = store.append(vec![
            Candle::new(100 * 60, 1.0, 2.0, 0.5, 1.5, 1.0),
            Candle::new(100 * 60, 1.0, 2.0, 0.5, 1.5, 1.0),
        ]);
        assert_eq!(outcome, AppendOutcome { added: 1, replaced: 0 });
        assert!(outcome.invalidates_cache());
        assert_eq!(store.last_time(), Some(6_000));
    }
}
