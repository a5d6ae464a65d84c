//! Slicing the memoized full series down to the visible interval.

use std::ops::Range;
use std::sync::Arc;

use charter_core::{Bounds, Candle, Resolution};

use crate::cache::ResampledPair;

/// `2031-01-01T00:00:00Z`. Padded window ends at or past this are pulled
/// back to the last raw candle.
pub const YEAR_2031: i64 = 1_924_992_000;

/// A contiguous run of a memoized resampled pair.
///
/// Linear and log series share their times, so one index range covers both.
#[derive(Debug, Clone)]
pub struct Window {
    pair: Arc<ResampledPair>,
    range: Range<usize>,
}

impl Window {
    /// The whole resampled series.
    pub fn full(pair: Arc<ResampledPair>) -> Self {
        let range = 0..pair.linear.len();
        Self { pair, range }
    }

    pub fn pair(&self) -> &Arc<ResampledPair> {
        &self.pair
    }

    pub fn resolution(&self) -> Resolution {
        self.pair.resolution()
    }

    pub fn linear(&self) -> &[Candle] {
        &self.pair.linear.candles()[self.range.clone()]
    }

    pub fn log(&self) -> &[Candle] {
        &self.pair.log.candles()[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.range == (0..self.pair.linear.len())
    }

    /// Bounds a window of this resolution is known to cover: one bin beyond
    /// the first and last candle, since bins straddle their edges.
    pub fn covered_bounds(&self) -> Option<Bounds> {
        let candles = self.linear();
        let pad = self.resolution().duration_seconds();
        match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => Some(Bounds::new(first.time - pad, last.time + pad)),
            _ => None,
        }
    }

    /// Time of the first and last candle.
    pub fn time_bounds(&self) -> Option<Bounds> {
        let candles = self.linear();
        match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => Some(Bounds::new(first.time, last.time)),
            _ => None,
        }
    }
}

/// Cuts windows with over-fetch so small pans stay inside what is materialized.
#[derive(Debug, Clone, Copy)]
pub struct WindowCutter {
    /// Padding in candles added on each side of the requested interval.
    pad_candles: u32,
}

impl Default for WindowCutter {
    fn default() -> Self {
        Self { pad_candles: 800 }
    }
}

fn floor_minute(time: i64) -> i64 {
    time.div_euclid(60) * 60
}

impl WindowCutter {
    pub fn new(pad_candles: u32) -> Self {
        Self { pad_candles }
    }

    /// Exclusive cut bounds for `interval` at `resolution`.
    ///
    /// Both ends snap down to whole minutes. An end that is not already past
    /// the dataset edge is pushed outward by the padding, then each end is
    /// clamped to the dataset. Ends at or beyond 2031 are also clamped.
    pub fn padded_interval(
        &self,
        interval: Bounds,
        absolute: Bounds,
        resolution: Resolution,
    ) -> Bounds {
        let pad = i64::from(self.pad_candles) * resolution.duration_seconds();
        let mut start = floor_minute(interval.start);
        let mut end = floor_minute(interval.end);

        if start >= absolute.start {
            start -= pad;
        }
        if end <= absolute.end {
            end += pad;
        }
        if start < absolute.start {
            start = absolute.start;
        }
        if end > absolute.end || end >= YEAR_2031 {
            end = absolute.end;
        }
        Bounds::new(start, end)
    }

    /// Candles of `pair` strictly inside the padded interval.
    pub fn cut(&self, pair: Arc<ResampledPair>, interval: Bounds, absolute: Bounds) -> Window {
        let padded = self.padded_interval(interval, absolute, pair.resolution());
        let candles = pair.linear.candles();
        let lo = candles.partition_point(|c| c.time <= padded.start);
        let hi = candles.partition_point(|c| c.time < padded.end).max(lo);
        log::trace!(
            "cut {} to ({}, {}): {} of {} candles",
            pair.resolution(),
            padded.start,
            padded.end,
            hi - lo,
            candles.len()
        );
        Window { pair, range: lo..hi }
    }

    /// Whether a window covering `current` must be re-cut to show `requested`.
    ///
    /// Only sides that are not already fully materialized count, and the
    /// request is clamped to the dataset first.
    pub fn needs_recut(current: Bounds, absolute: Bounds, requested: Bounds) -> bool {
        let start_open = current.start > absolute.start;
        let end_open = current.end < absolute.end;
        if !start_open && !end_open {
            return false;
        }
        let start = requested.start.max(absolute.start);
        let end = requested.end.min(absolute.end);
        (start_open && start < current.start) || (end_open && end > current.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_core::{Series, SeriesStore};

    fn pair(count: i64) -> Arc<ResampledPair> {
        let candles = (0..count)
            .map(|i| Candle::new(60 * i, 10.0, 11.0, 9.0, 10.0, 1.0))
            .collect();
        let store = SeriesStore::new(Series::new(Resolution::minutes(1), candles).unwrap());
        let linear = store.resample(Resolution::minutes(1), false).unwrap();
        let log = linear.to_log10();
        Arc::new(ResampledPair { linear, log })
    }

    #[test]
    fn test_padded_interval_pads_and_clamps() {
        let cutter = WindowCutter::new(10);
        let m1 = Resolution::minutes(1);
        let absolute = Bounds::new(0, 100_000);
        // Snapped down to minutes then padded by 10 minutes each side.
        assert_eq!(
            cutter.padded_interval(Bounds::new(50_030, 60_059), absolute, m1),
            Bounds::new(49_980 - 600, 60_000 + 600)
        );
        // Clamped at both dataset edges.
        assert_eq!(
            cutter.padded_interval(Bounds::new(100, 99_900), absolute, m1),
            Bounds::new(0, 100_000)
        );
        // Already outside the data: no padding, clamp only.
        assert_eq!(
            cutter.padded_interval(Bounds::new(-5_000, 200_000), absolute, m1),
            absolute
        );
    }

    #[test]
    fn test_padded_interval_year_2031_clamp() {
        let cutter = WindowCutter::new(10);
        let absolute = Bounds::new(0, YEAR_2031 + 86_400);
        let padded = cutter.padded_interval(
            Bounds::new(YEAR_2031 - 3_600, YEAR_2031 + 60),
            absolute,
            Resolution::minutes(1),
        );
        assert_eq!(padded.end, absolute.end);
    }

    #[test]
    fn test_cut_is_strictly_inside() {
        let cutter = WindowCutter::new(2);
        let pair = pair(100);
        let absolute = pair.linear.bounds().unwrap();
        let window = cutter.cut(pair, Bounds::new(1_200, 1_800), absolute);
        // Padded to (1080, 1920): times 1140..=1860.
        assert_eq!(window.linear().first().unwrap().time, 1_140);
        assert_eq!(window.linear().last().unwrap().time, 1_860);
        assert_eq!(window.log().len(), window.len());
        assert_eq!(window.covered_bounds(), Some(Bounds::new(1_080, 1_920)));
        assert!(!window.is_full());
    }

    #[test]
    fn test_cut_outside_data_is_empty() {
        let cutter = WindowCutter::new(2);
        let pair = pair(10);
        let absolute = pair.linear.bounds().unwrap();
        let window = cutter.cut(pair, Bounds::new(10_000, 20_000), absolute);
        assert!(window.is_empty());
        assert_eq!(window.covered_bounds(), None);
    }

    #[test]
    fn test_needs_recut() {
        let absolute = Bounds::new(0, 10_000);
        let current = Bounds::new(2_000, 8_000);
        assert!(!WindowCutter::needs_recut(current, absolute, Bounds::new(3_000, 7_000)));
        assert!(WindowCutter::needs_recut(current, absolute, Bounds::new(1_000, 7_000)));
        assert!(WindowCutter::needs_recut(current, absolute, Bounds::new(3_000, 9_000)));

        // Fully materialized: never.
        let full = Bounds::new(-60, 10_060);
        assert!(!WindowCutter::needs_recut(full, absolute, Bounds::new(-1_000, 20_000)));

        // Start side materialized: a request past the start is clamped away.
        let left_done = Bounds::new(0, 8_000);
        assert!(!WindowCutter::needs_recut(left_done, absolute, Bounds::new(-500, 7_000)));
        assert!(WindowCutter::needs_recut(left_done, absolute, Bounds::new(-500, 8_500)));
    }

    fn contains_all(window: &Window, wanted: &[Candle]) -> bool {
        let shown = window.linear();
        wanted
            .iter()
            .all(|c| shown.binary_search_by_key(&c.time, |s| s.time).is_ok())
    }

    #[test]
    fn test_no_recut_inside_padded_window() {
        let cutter = WindowCutter::default();
        let pair = pair(50_000);
        let absolute = pair.linear.bounds().unwrap();
        let interval = Bounds::new(1_000_000, 1_100_000);
        let window = cutter.cut(Arc::clone(&pair), interval, absolute);
        let covered = window.covered_bounds().unwrap();

        let requests = [
            interval,
            Bounds::new(interval.start - 20_000, interval.end + 20_000),
            Bounds::new(covered.start + 60, covered.end - 60),
        ];
        for request in requests {
            assert!(!WindowCutter::needs_recut(covered, absolute, request));
            let wanted = pair.linear.between_exclusive(request.start, request.end);
            assert!(!wanted.is_empty());
            assert!(contains_all(&window, wanted), "{request:?}");
        }

        // Past the padding: a re-cut is due and the window is missing candles.
        let beyond = Bounds::new(interval.start, covered.end + 3_600);
        assert!(WindowCutter::needs_recut(covered, absolute, beyond));
        let wanted = pair.linear.between_exclusive(beyond.start, beyond.end);
        assert!(!contains_all(&window, wanted));
    }
}
