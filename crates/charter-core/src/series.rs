//! Ordered candle series tagged with their resolution.

use std::collections::BTreeMap;

use crate::candle::Candle;
use crate::error::{CoreError, Result};
use crate::timeframe::Resolution;

/// Inclusive time bounds of a series or a materialized window, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub start: i64,
    pub end: i64,
}

impl Bounds {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> i64 {
        self.end - self.start
    }

    pub fn contains(&self, time: i64) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Candles with strictly increasing, unique times.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    resolution: Resolution,
    candles: Vec<Candle>,
}

/// What a merge did to the series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Candles at times the series did not have before.
    pub added: usize,
    /// Existing candles overwritten by a candle with the same time.
    pub replaced: usize,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.added + self.replaced > 0
    }
}

impl Series {
    /// Wraps candles that are already strictly ordered by time.
    pub fn new(resolution: Resolution, candles: Vec<Candle>) -> Result<Self> {
        if let Some(pair) = candles.windows(2).find(|pair| pair[0].time >= pair[1].time) {
            return Err(CoreError::UnsortedSeries(pair[1].time));
        }
        Ok(Self {
            resolution,
            candles,
        })
    }

    /// Sorts candles and drops duplicate times, keeping the last occurrence.
    pub fn from_unsorted(resolution: Resolution, candles: Vec<Candle>) -> Self {
        let by_time: BTreeMap<i64, Candle> = candles.into_iter().map(|c| (c.time, c)).collect();
        Self {
            resolution,
            candles: by_time.into_values().collect(),
        }
    }

    pub fn empty(resolution: Resolution) -> Self {
        Self {
            resolution,
            candles: Vec::new(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Time of the first and last candle.
    pub fn bounds(&self) -> Option<Bounds> {
        match (self.candles.first(), self.candles.last()) {
            (Some(first), Some(last)) => Some(Bounds::new(first.time, last.time)),
            _ => None,
        }
    }

    /// Candles with `start < time < end`.
    pub fn between_exclusive(&self, start: i64, end: i64) -> &[Candle] {
        let lo = self.candles.partition_point(|c| c.time <= start);
        let hi = self.candles.partition_point(|c| c.time < end);
        if lo >= hi {
            &[]
        } else {
            &self.candles[lo..hi]
        }
    }

    /// A new series holding `start < time < end`.
    pub fn slice_exclusive(&self, start: i64, end: i64) -> Self {
        Self {
            resolution: self.resolution,
            candles: self.between_exclusive(start, end).to_vec(),
        }
    }

    /// The same series with prices mapped through `log10`.
    pub fn to_log10(&self) -> Self {
        Self {
            resolution: self.resolution,
            candles: self.candles.iter().map(Candle::log10).collect(),
        }
    }

    /// Re-tags the series without touching its candles.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Merges `incoming` into the series by time.
    ///
    /// Incoming candles replace existing ones with the same time; within the
    /// batch the last occurrence wins. The series stays strictly ordered.
    pub fn merge(&mut self, incoming: Vec<Candle>) -> MergeOutcome {
        if incoming.is_empty() {
            return MergeOutcome::default();
        }
        let batch: BTreeMap<i64, Candle> = incoming.into_iter().map(|c| (c.time, c)).collect();

        // Fast path: the whole batch lands after the current tail.
        let tail = self.candles.last().map(|c| c.time);
        if batch.keys().next().zip(tail).map_or(true, |(first, tail)| *first > tail) {
            let added = batch.len();
            self.candles.extend(batch.into_values());
            return MergeOutcome { added, replaced: 0 };
        }

        let mut outcome = MergeOutcome::default();
        let mut merged = Vec::with_capacity(self.candles.len() + batch.len());
        let mut existing = std::mem::take(&mut self.candles).into_iter().peekable();
        for (time, candle) in batch {
            while let Some(old) = existing.next_if(|old| old.time < time) {
                merged.push(old);
            }
            if existing.next_if(|old| old.time == time).is_some() {
                outcome.replaced += 1;
            } else {
                outcome.added += 1;
            }
            merged.push(candle);
        }
        merged.extend(existing);
        self.candles = merged;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, close: f64) -> Candle {
        Candle::new(time, close, close + 1.0, close - 1.0, close, 1.0)
    }

    fn series(times: &[i64]) -> Series {
        let candles = times.iter().map(|&t| candle(t, 10.0)).collect();
        Series::new(Resolution::minutes(1), candles).unwrap()
    }

    #[test]
    fn test_new_rejects_unsorted_and_duplicates() {
        let m1 = Resolution::minutes(1);
        assert_eq!(
            Series::new(m1, vec![candle(120, 1.0), candle(60, 1.0)]),
            Err(CoreError::UnsortedSeries(60))
        );
        assert_eq!(
            Series::new(m1, vec![candle(60, 1.0), candle(60, 2.0)]),
            Err(CoreError::UnsortedSeries(60))
        );
    }

    #[test]
    fn test_from_unsorted_keeps_last_duplicate() {
        let s = Series::from_unsorted(
            Resolution::minutes(1),
            vec![candle(120, 1.0), candle(60, 2.0), candle(120, 3.0)],
        );
        let times: Vec<i64> = s.candles().iter().map(|c| c.time).collect();
        assert_eq!(times, [60, 120]);
        assert_eq!(s.last().unwrap().close, 3.0);
    }

    #[test]
    fn test_between_exclusive() {
        let s = series(&[0, 60, 120, 180, 240]);
        let times: Vec<i64> = s.between_exclusive(60, 240).iter().map(|c| c.time).collect();
        assert_eq!(times, [120, 180]);
        assert!(s.between_exclusive(120, 120).is_empty());
        assert!(s.between_exclusive(300, 100).is_empty());
        assert_eq!(s.between_exclusive(-1, 241).len(), 5);
    }

    #[test]
    fn test_merge_appends_tail() {
        let mut s = series(&[0, 60]);
        let outcome = s.merge(vec![candle(180, 1.0), candle(120, 1.0)]);
        assert_eq!(outcome, MergeOutcome { added: 2, replaced: 0 });
        let times: Vec<i64> = s.candles().iter().map(|c| c.time).collect();
        assert_eq!(times, [0, 60, 120, 180]);
    }

    #[test]
    fn test_merge_overlapping_refetch() {
        let mut s = series(&[0, 60, 120]);
        let outcome = s.merge(vec![candle(120, 42.0), candle(180, 1.0), candle(30, 5.0)]);
        assert_eq!(outcome, MergeOutcome { added: 2, replaced: 1 });
        let times: Vec<i64> = s.candles().iter().map(|c| c.time).collect();
        assert_eq!(times, [0, 30, 60, 120, 180]);
        assert_eq!(s.candles()[3].close, 42.0);
    }

    #[test]
    fn test_merge_duplicate_batch_yields_one_candle() {
        let mut s = Series::empty(Resolution::minutes(1));
        s.merge(vec![candle(100, 1.0), candle(100, 2.0)]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.candles()[0].time, 100);
        assert_eq!(s.candles()[0].close, 2.0);
    }
}
