//! Background work owned by a chart: cache warm-up and live updates.
//!
//! Warm-up runs on a plain thread; the live-update poller runs on a tokio
//! runtime supplied by the caller. Both report through a `ChartEvent` channel
//! that the control thread drains, and neither ever hands an error back to
//! the control thread directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use charter_core::{AppendOutcome, FrequencyLadder};
use charter_data::UpdateSource;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;

use crate::data::{read, write, SharedData};
use crate::error::Result;

/// Messages sent from a chart's background tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    /// Every ladder rung is cached for `generation`.
    WarmupFinished { rungs: usize, generation: u64 },
    /// The cache was cleared mid warm-up; a newer warm-up takes over.
    WarmupSuperseded { generation: u64 },
    WarmupFailed(String),
    /// A live update merged new candles.
    Updated {
        added: usize,
        replaced: usize,
        last_time: Option<i64>,
    },
    /// A live update failed; the chart keeps its previous data.
    UpdateFailed(String),
}

/// Fetches candles newer than the store's last one and merges them.
///
/// The merge and the cache clear happen under one write lock. On failure
/// nothing is changed.
pub async fn update_once<S: UpdateSource>(data: &SharedData, source: &S) -> Result<AppendOutcome> {
    let last_time = read(data).store.last_time();
    let Some(after) = last_time else {
        return Ok(AppendOutcome::default());
    };
    let batch = source.fetch_after(after).await?;
    if batch.is_empty() {
        return Ok(AppendOutcome::default());
    }
    let outcome = write(data).apply_update(batch);
    Ok(outcome)
}

/// Computes every rung of `ladder` into the cache, one read lock per rung.
///
/// Returns `None` when cancelled.
fn warm_up(data: &SharedData, ladder: &FrequencyLadder, cancel: &AtomicBool) -> Option<ChartEvent> {
    let generation = read(data).cache.generation();
    for rung in ladder.iter() {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        let data = read(data);
        if data.cache.generation() != generation {
            return Some(ChartEvent::WarmupSuperseded { generation });
        }
        if let Err(e) = data.pair(*rung) {
            return Some(ChartEvent::WarmupFailed(format!("{}: {}", rung, e)));
        }
    }
    Some(ChartEvent::WarmupFinished {
        rungs: ladder.len(),
        generation,
    })
}

fn spawn_warmup(
    data: SharedData,
    ladder: FrequencyLadder,
    events: Sender<ChartEvent>,
    cancel: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Some(event) = warm_up(&data, &ladder, &cancel) {
            match &event {
                ChartEvent::WarmupFinished { rungs, generation } => {
                    log::debug!("warmed {} rungs for generation {}", rungs, generation)
                }
                ChartEvent::WarmupFailed(e) => log::warn!("warm-up failed: {}", e),
                _ => {}
            }
            let _ = events.send(event);
        }
    })
}

/// Handles to a chart's running tasks. Dropping it cancels and joins them.
#[derive(Debug, Default)]
pub struct ChartTasks {
    cancel: Arc<AtomicBool>,
    warmups: Arc<Mutex<Vec<JoinHandle<()>>>>,
    poller: Option<tokio::task::JoinHandle<()>>,
}

fn track(warmups: &Mutex<Vec<JoinHandle<()>>>, handle: JoinHandle<()>) {
    let mut warmups = warmups.lock().unwrap_or_else(PoisonError::into_inner);
    warmups.retain(|h| !h.is_finished());
    warmups.push(handle);
}

impl ChartTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a one-shot warm-up of every rung on a background thread.
    ///
    /// Starting a task after [`shutdown`](Self::shutdown) re-arms the
    /// cancel flag.
    pub fn spawn_warmup(&self, data: SharedData, ladder: FrequencyLadder, events: Sender<ChartEvent>) {
        self.cancel.store(false, Ordering::Relaxed);
        let handle = spawn_warmup(data, ladder, events, Arc::clone(&self.cancel));
        track(&self.warmups, handle);
    }

    /// Starts polling `source` every `period`, replacing any running poller.
    ///
    /// The first poll happens immediately. With `rewarm`, every update that
    /// changed the data starts a fresh warm-up.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_poller<S: UpdateSource + 'static>(
        &mut self,
        runtime: &Handle,
        data: SharedData,
        source: S,
        period: Duration,
        ladder: FrequencyLadder,
        rewarm: bool,
        events: Sender<ChartEvent>,
    ) {
        self.stop_polling();
        self.cancel.store(false, Ordering::Relaxed);
        let cancel = Arc::clone(&self.cancel);
        let warmups = Arc::clone(&self.warmups);

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                match update_once(&data, &source).await {
                    Ok(outcome) => {
                        let last_time = read(&data).store.last_time();
                        if outcome.invalidates_cache() {
                            log::info!(
                                "live update: {} new, {} replaced, last candle {:?}",
                                outcome.added,
                                outcome.replaced,
                                last_time
                            );
                        }
                        let _ = events.send(ChartEvent::Updated {
                            added: outcome.added,
                            replaced: outcome.replaced,
                            last_time,
                        });
                        if rewarm && outcome.invalidates_cache() {
                            let handle = spawn_warmup(
                                Arc::clone(&data),
                                ladder.clone(),
                                events.clone(),
                                Arc::clone(&cancel),
                            );
                            track(&warmups, handle);
                        }
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        let _ = events.send(ChartEvent::UpdateFailed(e.to_string()));
                    }
                }
            }
        });
        self.poller = Some(handle);
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
    }

    /// Aborts the poller. An update already holding the write lock completes.
    pub fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }

    /// Cancels every task and waits for warm-up threads to exit.
    pub fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.stop_polling();
        let handles: Vec<JoinHandle<()>> = self
            .warmups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                log::warn!("warm-up thread panicked");
            }
        }
    }
}

impl Drop for ChartTasks {
    fn drop(&mut self) {
        self.shutdown();
    }
}
