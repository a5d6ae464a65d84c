//! Per-chart memo of resampled series.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use charter_core::{FrequencyLadder, Resolution, Series, SeriesStore};

/// A resampled series in linear and log10 price space.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledPair {
    pub linear: Series,
    pub log: Series,
}

impl ResampledPair {
    fn compute(
        store: &SeriesStore,
        resolution: Resolution,
        cut_partial_bins: bool,
    ) -> charter_core::Result<Self> {
        let linear = store.resample(resolution, cut_partial_bins)?;
        let log = linear.to_log10();
        Ok(Self { linear, log })
    }

    pub fn resolution(&self) -> Resolution {
        self.linear.resolution()
    }
}

type Slot = Arc<Mutex<Option<Arc<ResampledPair>>>>;

/// Memoizes `(linear, log)` series per resolution.
///
/// Each resolution is computed at most once per cache lifetime: a second
/// caller for the same resolution blocks on the in-flight slot and then shares
/// the result. Failed computations are not stored.
#[derive(Debug, Default)]
pub struct ResampleCache {
    slots: Mutex<HashMap<Resolution, Slot>>,
    generation: AtomicU64,
    cut_partial_bins: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ResampleCache {
    pub fn new(cut_partial_bins: bool) -> Self {
        Self {
            cut_partial_bins,
            ..Self::default()
        }
    }

    pub fn get_or_compute(
        &self,
        store: &SeriesStore,
        resolution: Resolution,
    ) -> charter_core::Result<Arc<ResampledPair>> {
        let slot = Arc::clone(lock(&self.slots).entry(resolution).or_default());

        let mut entry = lock(&slot);
        if let Some(pair) = entry.as_ref() {
            log::trace!("cache hit for {}", resolution);
            return Ok(Arc::clone(pair));
        }

        let pair = Arc::new(ResampledPair::compute(store, resolution, self.cut_partial_bins)?);
        log::debug!("cached {} ({} candles)", resolution, pair.linear.len());
        *entry = Some(Arc::clone(&pair));
        Ok(pair)
    }

    /// Drops every entry and starts a new generation.
    pub fn clear(&self) {
        lock(&self.slots).clear();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("cache cleared, generation {}", generation);
    }

    /// Bumped by every [`clear`](Self::clear); a window materialized under an
    /// older generation is stale.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Precomputes every rung of `ladder`, returning how many were computed.
    ///
    /// Stops at the first failure.
    pub fn warm(
        &self,
        store: &SeriesStore,
        ladder: &FrequencyLadder,
    ) -> charter_core::Result<usize> {
        for resolution in ladder.iter() {
            self.get_or_compute(store, *resolution)?;
        }
        Ok(ladder.len())
    }

    pub fn is_cached(&self, resolution: Resolution) -> bool {
        let Some(slot) = lock(&self.slots).get(&resolution).cloned() else {
            return false;
        };
        let cached = lock(&slot).is_some();
        cached
    }

    /// Number of resolutions with a stored result.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
