//! Raw series and resample cache shared between a chart and its tasks.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use charter_core::{AppendOutcome, Candle, Resolution, SeriesStore};

use crate::cache::{ResampleCache, ResampledPair};

/// A chart's store and cache. Appends and cache clears happen together under
/// the write lock, so readers never see new candles with stale resamples.
#[derive(Debug)]
pub struct ChartData {
    pub store: SeriesStore,
    pub cache: ResampleCache,
}

pub type SharedData = Arc<RwLock<ChartData>>;

impl ChartData {
    pub fn new(store: SeriesStore, cache: ResampleCache) -> Self {
        Self { store, cache }
    }

    pub fn into_shared(self) -> SharedData {
        Arc::new(RwLock::new(self))
    }

    pub fn pair(&self, resolution: Resolution) -> charter_core::Result<Arc<ResampledPair>> {
        self.cache.get_or_compute(&self.store, resolution)
    }

    /// Merges a fetched batch and clears the cache if anything changed.
    pub fn apply_update(&mut self, batch: Vec<Candle>) -> AppendOutcome {
        let outcome = self.store.append(batch);
        if outcome.invalidates_cache() {
            self.cache.clear();
        }
        outcome
    }
}

pub(crate) fn read(data: &SharedData) -> RwLockReadGuard<'_, ChartData> {
    data.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write(data: &SharedData) -> RwLockWriteGuard<'_, ChartData> {
    data.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_update_clears_only_on_change() {
        let candles = (0..120)
            .map(|i| Candle::new(60 * i, 1.0, 2.0, 0.5, 1.5, 1.0))
            .collect();
        let store = SeriesStore::from_candles(Resolution::minutes(1), candles).unwrap();
        let mut data = ChartData::new(store, ResampleCache::default());

        let hourly = data.pair(Resolution::hours(1)).unwrap();
        assert_eq!(hourly.linear.len(), 2);

        data.apply_update(Vec::new());
        assert_eq!(data.cache.generation(), 0);

        let outcome = data.apply_update(vec![Candle::new(7_200, 1.0, 3.0, 0.5, 2.0, 4.0)]);
        assert_eq!(outcome.added, 1);
        assert_eq!(data.cache.generation(), 1);
        assert_eq!(data.pair(Resolution::hours(1)).unwrap().linear.len(), 3);
    }
}
