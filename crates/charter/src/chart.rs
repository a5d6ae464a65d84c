//! A candlestick chart: raw data, resample cache and the visible window.
//!
//! The control thread owns the [`Chart`] and drives it with viewport events.
//! Background tasks only touch the shared [`ChartData`]; the chart notices
//! their changes through the cache generation and re-materializes its window.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use charter_config::LiveConfig;
use charter_core::{
    AppendOutcome, Bounds, Candle, CoreError, FrequencyLadder, Resolution, Series, SeriesStore,
};
use charter_data::{BinanceFeed, UpdateSource};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::cache::{ResampleCache, ResampledPair};
use crate::cutter::{Window, WindowCutter};
use crate::data::{read, write, ChartData, SharedData};
use crate::descriptor::ChartDescriptor;
use crate::error::{ChartError, Result};
use crate::lod::LodController;
use crate::settings::ChartSettings;
use crate::tasks::{update_once, ChartEvent, ChartTasks};

/// Price axis scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    #[default]
    Linear,
    Log,
}

/// What the renderer draws.
#[derive(Debug, Clone, Copy)]
pub struct RenderSlice<'a> {
    pub resolution: Resolution,
    pub scale: ScaleMode,
    pub candles: &'a [Candle],
}

/// Active resolution and the materialized window.
#[derive(Debug, Clone)]
pub struct DisplayState {
    active_resolution: Resolution,
    window: Window,
    /// What the window is known to cover; drives re-cut decisions.
    window_bounds: Option<Bounds>,
    /// First and last raw candle.
    absolute_bounds: Bounds,
    /// Cache generation the window was materialized from.
    generation: u64,
}

impl DisplayState {
    pub fn active_resolution(&self) -> Resolution {
        self.active_resolution
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn window_bounds(&self) -> Option<Bounds> {
        self.window_bounds
    }

    pub fn absolute_bounds(&self) -> Bounds {
        self.absolute_bounds
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct Chart {
    descriptor: ChartDescriptor,
    data: SharedData,
    ladder: FrequencyLadder,
    lod: LodController,
    cutter: WindowCutter,
    state: DisplayState,
    scale: ScaleMode,
    auto_resample: bool,
    rewarm_after_update: bool,
    last_interval: Option<Bounds>,
    events_tx: Sender<ChartEvent>,
    events_rx: Receiver<ChartEvent>,
    tasks: ChartTasks,
}

impl std::fmt::Debug for Chart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chart")
            .field("label", &self.descriptor.label)
            .field("active_resolution", &self.state.active_resolution)
            .field("window_len", &self.state.window.len())
            .field("auto_resample", &self.auto_resample)
            .finish()
    }
}

impl Chart {
    /// Builds a chart over `candles` recorded at the descriptor's native
    /// resolution.
    ///
    /// Candles may be unordered; duplicate times keep the last occurrence.
    /// The initial resolution is chosen as if the whole dataset were in view,
    /// and the whole resampled series is materialized.
    pub fn new(
        descriptor: ChartDescriptor,
        candles: Vec<Candle>,
        settings: &ChartSettings,
    ) -> Result<Self> {
        let native = descriptor.native_resolution;
        let store = SeriesStore::new(Series::from_unsorted(native, candles));
        let absolute = store.absolute_bounds().ok_or(CoreError::EmptySeries)?;
        let ladder = settings.ladder.for_native(native)?;
        let active = ladder.finest().unwrap_or(native);

        let lod = LodController::new(settings.thresholds);
        let target = if absolute.span() > 0 {
            lod.abrupt_target(&ladder, active, absolute)?
        } else {
            active
        };

        let cache = ResampleCache::new(settings.cut_partial_bins);
        let pair = cache.get_or_compute(&store, target)?;
        let window = Window::full(pair);
        let window_bounds = window.time_bounds();
        log::info!(
            "{}: {} {} candles, starting at {} ({} candles)",
            descriptor.label,
            store.len(),
            native,
            target,
            window.len()
        );

        let (events_tx, events_rx) = mpsc::channel();
        let mut chart = Self {
            descriptor,
            data: ChartData::new(store, cache).into_shared(),
            ladder,
            lod,
            cutter: WindowCutter::new(settings.thresholds.htf),
            state: DisplayState {
                active_resolution: target,
                window,
                window_bounds,
                absolute_bounds: absolute,
                generation: 0,
            },
            scale: ScaleMode::default(),
            auto_resample: settings.auto_resample,
            rewarm_after_update: settings.rewarm_after_update,
            last_interval: None,
            events_tx,
            events_rx,
            tasks: ChartTasks::new(),
        };
        if settings.warm_on_start {
            chart.start_warmup();
        }
        Ok(chart)
    }

    /// Rebuilds a chart from a saved descriptor by loading its source.
    pub fn reconstruct(descriptor: ChartDescriptor, settings: &ChartSettings) -> Result<Self> {
        let candles = descriptor.source.load()?;
        Self::new(descriptor, candles, settings)
    }

    /// Saved state for [`reconstruct`](Self::reconstruct).
    pub fn describe(&self) -> ChartDescriptor {
        self.descriptor.clone()
    }

    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    pub fn ladder(&self) -> &FrequencyLadder {
        &self.ladder
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn active_resolution(&self) -> Resolution {
        self.state.active_resolution
    }

    pub fn auto_resample(&self) -> bool {
        self.auto_resample
    }

    pub fn set_auto_resample(&mut self, enabled: bool) {
        self.auto_resample = enabled;
    }

    pub fn scale(&self) -> ScaleMode {
        self.scale
    }

    pub fn set_scale(&mut self, scale: ScaleMode) {
        self.scale = scale;
    }

    /// Last interval seen by a viewport event.
    pub fn last_interval(&self) -> Option<Bounds> {
        self.last_interval
    }

    /// Shared store and cache, as seen by the background tasks.
    pub fn data(&self) -> &SharedData {
        &self.data
    }

    /// The materialized window in the current scale.
    pub fn render_slice(&self) -> RenderSlice<'_> {
        let candles = match self.scale {
            ScaleMode::Linear => self.state.window.linear(),
            ScaleMode::Log => self.state.window.log(),
        };
        RenderSlice {
            resolution: self.state.active_resolution,
            scale: self.scale,
            candles,
        }
    }

    /// Handles a continuous pan or zoom.
    ///
    /// Re-cuts if the interval left the materialized window, then, with
    /// auto-resampling on, moves at most one rung. Degenerate intervals are
    /// ignored.
    pub fn on_viewport_changed(&mut self, interval: Bounds) -> Result<()> {
        self.maybe_cut_to_interval(interval)?;
        if self.auto_resample {
            self.resample_to_interval(interval)?;
        }
        Ok(())
    }

    /// Handles a sudden jump of the viewport (open, reset, fit).
    ///
    /// May move several rungs; on a change the whole resampled series is
    /// materialized.
    pub fn on_viewport_abrupt(&mut self, interval: Bounds) -> Result<()> {
        self.maybe_cut_to_interval(interval)?;
        self.resample_to_interval_abrupt(interval)
    }

    /// Re-cuts only if `interval` reaches past what is materialized.
    pub fn maybe_cut_to_interval(&mut self, interval: Bounds) -> Result<()> {
        if interval.start >= interval.end {
            return Ok(());
        }
        self.refresh_if_stale()?;
        self.last_interval = Some(interval);
        if let Some(current) = self.state.window_bounds {
            if WindowCutter::needs_recut(current, self.state.absolute_bounds, interval) {
                self.cut_to(interval);
            }
        }
        Ok(())
    }

    /// One-rung re-target followed by a cut to `interval`.
    pub fn resample_to_interval(&mut self, interval: Bounds) -> Result<()> {
        if interval.start >= interval.end {
            return Ok(());
        }
        if let Some(target) = self
            .lod
            .incremental_target(&self.ladder, self.state.active_resolution, interval)
        {
            self.switch_to(target)?;
            self.cut_to(interval);
        }
        Ok(())
    }

    /// Multi-rung re-target; the whole resampled series stays materialized.
    pub fn resample_to_interval_abrupt(&mut self, interval: Bounds) -> Result<()> {
        self.refresh_if_stale()?;
        let target = self
            .lod
            .abrupt_target(&self.ladder, self.state.active_resolution, interval)?;
        self.switch_to(target)
    }

    /// Manual resolution choice. Turns auto-resampling off and cuts to the
    /// last interval seen.
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        let index = self
            .ladder
            .index_of(&resolution)
            .ok_or(CoreError::UnknownResolution(resolution))?;
        let rung = self.ladder.get(index).unwrap_or(resolution);
        log::info!("{}: manual resample to {}", self.descriptor.label, rung);
        self.auto_resample = false;
        self.refresh_if_stale()?;
        self.switch_to(rung)?;
        if let Some(interval) = self.last_interval {
            self.cut_to(interval);
        }
        Ok(())
    }

    /// Merges candles on the control thread, like a live update would.
    pub fn append(&mut self, batch: Vec<Candle>) -> Result<AppendOutcome> {
        let outcome = write(&self.data).apply_update(batch);
        self.refresh_if_stale()?;
        Ok(outcome)
    }

    /// Runs one live update in the caller's task and refreshes the window.
    pub async fn update_from<S: UpdateSource>(&mut self, source: &S) -> Result<AppendOutcome> {
        let outcome = update_once(&self.data, source).await?;
        self.refresh_if_stale()?;
        Ok(outcome)
    }

    /// Re-materializes the active resolution if the cache was cleared since
    /// the window was cut. Returns whether it did.
    pub fn refresh_if_stale(&mut self) -> Result<bool> {
        let (pair, generation, absolute) = {
            let data = read(&self.data);
            let generation = data.cache.generation();
            if generation == self.state.generation {
                return Ok(false);
            }
            let absolute = data.store.absolute_bounds().ok_or(CoreError::EmptySeries)?;
            (data.pair(self.state.active_resolution)?, generation, absolute)
        };
        log::debug!(
            "{}: data changed (generation {}), re-materializing {}",
            self.descriptor.label,
            generation,
            self.state.active_resolution
        );
        self.state.absolute_bounds = absolute;
        self.state.generation = generation;
        self.materialize(pair);
        if let Some(interval) = self.last_interval {
            self.cut_to(interval);
        }
        Ok(true)
    }

    /// Drains pending task events, refreshing the window after updates.
    pub fn poll_events(&mut self) -> Vec<ChartEvent> {
        let events: Vec<ChartEvent> = self.events_rx.try_iter().collect();
        if events.iter().any(|e| matches!(e, ChartEvent::Updated { .. })) {
            if let Err(e) = self.refresh_if_stale() {
                log::warn!("{}: refresh after update failed: {}", self.descriptor.label, e);
            }
        }
        events
    }

    /// Waits up to `timeout` for the next task event.
    pub fn wait_event(&mut self, timeout: Duration) -> Option<ChartEvent> {
        let event = self.events_rx.recv_timeout(timeout).ok()?;
        if matches!(event, ChartEvent::Updated { .. }) {
            if let Err(e) = self.refresh_if_stale() {
                log::warn!("{}: refresh after update failed: {}", self.descriptor.label, e);
            }
        }
        Some(event)
    }

    /// Precomputes every rung of the ladder in the background.
    pub fn start_warmup(&mut self) {
        self.tasks
            .spawn_warmup(Arc::clone(&self.data), self.ladder.clone(), self.events_tx.clone());
    }

    /// Polls `source` every `period` on `runtime`, replacing any running poller.
    pub fn start_live_updates<S: UpdateSource + 'static>(
        &mut self,
        runtime: &Handle,
        source: S,
        period: Duration,
    ) {
        log::info!("{}: live updates every {:?}", self.descriptor.label, period);
        self.tasks.spawn_poller(
            runtime,
            Arc::clone(&self.data),
            source,
            period,
            self.ladder.clone(),
            self.rewarm_after_update,
            self.events_tx.clone(),
        );
    }

    /// Live updates from Binance for the descriptor's symbol.
    pub fn start_binance_updates(&mut self, runtime: &Handle, live: &LiveConfig) -> Result<()> {
        let symbol = self
            .descriptor
            .source
            .symbol()
            .ok_or(ChartError::MissingSymbol)?
            .to_string();
        let feed = BinanceFeed::new(
            live.base_url.as_str(),
            symbol,
            self.descriptor.native_resolution,
            Duration::from_secs(live.timeout_secs),
        )?;
        self.start_live_updates(runtime, feed, Duration::from_secs(live.interval_secs.max(1)));
        Ok(())
    }

    pub fn is_updating(&self) -> bool {
        self.tasks.is_polling()
    }

    pub fn stop_live_updates(&mut self) {
        self.tasks.stop_polling();
    }

    /// Cancels and joins every background task.
    pub fn shutdown(&mut self) {
        self.tasks.shutdown();
    }

    /// Makes `target` active with its whole series materialized.
    fn switch_to(&mut self, target: Resolution) -> Result<()> {
        if target == self.state.active_resolution {
            return Ok(());
        }
        let (pair, generation, absolute) = {
            let data = read(&self.data);
            let absolute = data.store.absolute_bounds().ok_or(CoreError::EmptySeries)?;
            (data.pair(target)?, data.cache.generation(), absolute)
        };
        log::info!(
            "{}: {} -> {}",
            self.descriptor.label,
            self.state.active_resolution,
            target
        );
        self.state.active_resolution = target;
        // An update may have landed since the last refresh.
        self.state.absolute_bounds = absolute;
        self.state.generation = generation;
        self.materialize(pair);
        Ok(())
    }

    fn materialize(&mut self, pair: Arc<ResampledPair>) {
        let window = Window::full(pair);
        if let Some(bounds) = window.covered_bounds() {
            self.state.window_bounds = Some(bounds);
        }
        self.state.window = window;
    }

    fn cut_to(&mut self, interval: Bounds) {
        let pair = Arc::clone(self.state.window.pair());
        let window = self.cutter.cut(pair, interval, self.state.absolute_bounds);
        if let Some(bounds) = window.covered_bounds() {
            self.state.window_bounds = Some(bounds);
        }
        log::debug!(
            "{}: cut {} to {} candles",
            self.descriptor.label,
            self.state.active_resolution,
            window.len()
        );
        self.state.window = window;
    }
}
