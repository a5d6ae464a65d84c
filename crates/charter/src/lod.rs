//! Viewport-driven choice of the display resolution.
//!
//! Two policies share the same thresholds. An *abrupt* re-target jumps as
//! many rungs as needed in one go (a freshly opened or reset viewport). An
//! *incremental* re-target moves at most one rung per viewport change, which
//! keeps pans and zooms from skipping resolutions.

use charter_config::LodConfig;
use charter_core::{Bounds, CoreError, Direction, FrequencyLadder, Resolution};

/// Candle-count thresholds that trigger a resolution change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodThresholds {
    /// More visible candles than this steps to a coarser resolution.
    pub htf: u32,
    /// Fewer visible candles than this steps to a finer resolution.
    pub ltf: u32,
    /// Assumed duration ratio between neighbouring rungs.
    pub step_base: u32,
}

impl Default for LodThresholds {
    fn default() -> Self {
        Self {
            htf: 800,
            ltf: 50,
            step_base: 5,
        }
    }
}

impl From<&LodConfig> for LodThresholds {
    fn from(config: &LodConfig) -> Self {
        Self {
            htf: config.htf_threshold,
            ltf: config.ltf_threshold,
            step_base: config.step_base,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LodController {
    thresholds: LodThresholds,
}

impl LodController {
    pub fn new(thresholds: LodThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> LodThresholds {
        self.thresholds
    }

    fn too_many(&self, candle_secs: i64, span: i64) -> bool {
        candle_secs * i64::from(self.thresholds.htf.max(1)) < span
    }

    fn too_few(&self, candle_secs: i64, span: i64) -> bool {
        candle_secs * i64::from(self.thresholds.ltf) > span
    }

    /// Resolution for a brand-new viewport, possibly several rungs away.
    ///
    /// Assumes neighbouring rungs differ by `step_base`, so the jump size is
    /// the smallest `k` that brings the visible count back under the
    /// threshold under that assumption. Jumping past the coarsest rung is an
    /// error; jumping past the finest clamps to it.
    pub fn abrupt_target(
        &self,
        ladder: &FrequencyLadder,
        current: Resolution,
        interval: Bounds,
    ) -> charter_core::Result<Resolution> {
        if interval.start >= interval.end {
            return Err(CoreError::InvalidInterval {
                start: interval.start,
                end: interval.end,
            });
        }
        let index = ladder
            .index_of(&current)
            .ok_or(CoreError::UnknownResolution(current))?;
        let span = interval.span();
        let candle_secs = current.duration_seconds();
        let base = f64::from(self.thresholds.step_base.max(2));

        if self.too_many(candle_secs, span) {
            let limit = (candle_secs * i64::from(self.thresholds.htf.max(1))) as f64;
            let mut steps = 1;
            while limit < span as f64 / base.powi(steps as i32) {
                steps += 1;
            }
            if index + steps >= ladder.len() {
                return Err(CoreError::RangeTooLarge {
                    from: current,
                    steps,
                    span_secs: span,
                });
            }
            return ladder.neighbor(&current, Direction::Coarser, steps);
        }

        if self.too_few(candle_secs, span) {
            let limit = (candle_secs * i64::from(self.thresholds.ltf)) as f64;
            let mut steps = 1;
            while limit > span as f64 * base.powi(steps as i32) {
                steps += 1;
            }
            return ladder.neighbor(&current, Direction::Finer, steps.min(index));
        }

        Ok(current)
    }

    /// One-rung adjustment for a pan or zoom; `None` means stay.
    ///
    /// A finer step wins over a coarser one. Stepping past either end of the
    /// ladder is silently skipped.
    pub fn incremental_target(
        &self,
        ladder: &FrequencyLadder,
        current: Resolution,
        interval: Bounds,
    ) -> Option<Resolution> {
        let index = ladder.index_of(&current)?;
        let span = interval.span();
        let candle_secs = current.duration_seconds();

        if index > 0 && self.too_few(candle_secs, span) {
            return ladder.neighbor(&current, Direction::Finer, 1).ok();
        }
        if self.too_many(candle_secs, span) {
            return ladder.neighbor(&current, Direction::Coarser, 1).ok();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> FrequencyLadder {
        FrequencyLadder::standard()
    }

    #[test]
    fn test_abrupt_coarsens_into_band() {
        let lod = LodController::default();
        let interval = Bounds::new(0, 10_000_000);
        let target = lod
            .abrupt_target(&ladder(), Resolution::minutes(1), interval)
            .unwrap();
        assert_eq!(target, Resolution::hours(4));
        let visible = interval.span() / target.duration_seconds();
        assert!((50..=800).contains(&visible), "{visible}");
    }

    #[test]
    fn test_abrupt_refines_with_clamp() {
        let lod = LodController::default();
        // 1 hour viewed at 1d: far too few candles; clamps at 1min.
        let target = lod
            .abrupt_target(&ladder(), Resolution::days(1), Bounds::new(0, 3_600))
            .unwrap();
        assert_eq!(target, Resolution::minutes(1));

        // 100 days at 1w: one step to 1d.
        let target = lod
            .abrupt_target(&ladder(), Resolution::weeks(1), Bounds::new(0, 100 * 86_400))
            .unwrap();
        assert_eq!(target, Resolution::days(1));
    }

    #[test]
    fn test_abrupt_stays_inside_band() {
        let lod = LodController::default();
        let target = lod
            .abrupt_target(&ladder(), Resolution::hours(1), Bounds::new(0, 200 * 3_600))
            .unwrap();
        assert_eq!(target, Resolution::hours(1));
    }

    #[test]
    fn test_abrupt_range_too_large() {
        let lod = LodController::default();
        let millennium = Bounds::new(0, 1_000 * 365 * 86_400);
        let err = lod
            .abrupt_target(&ladder(), Resolution::years(1), millennium)
            .unwrap_err();
        assert!(matches!(err, CoreError::RangeTooLarge { steps: 1, .. }));
    }

    #[test]
    fn test_abrupt_rejects_bad_input() {
        let lod = LodController::default();
        assert_eq!(
            lod.abrupt_target(&ladder(), Resolution::hours(1), Bounds::new(10, 10)),
            Err(CoreError::InvalidInterval { start: 10, end: 10 })
        );
        assert_eq!(
            lod.abrupt_target(&ladder(), Resolution::minutes(7), Bounds::new(0, 10)),
            Err(CoreError::UnknownResolution(Resolution::minutes(7)))
        );
    }

    #[test]
    fn test_incremental_moves_one_rung() {
        let lod = LodController::default();
        let ladder = ladder();
        let huge = Bounds::new(0, 10_000_000);
        assert_eq!(
            lod.incremental_target(&ladder, Resolution::minutes(1), huge),
            Some(Resolution::minutes(5))
        );
        let tiny = Bounds::new(0, 600);
        assert_eq!(
            lod.incremental_target(&ladder, Resolution::days(1), tiny),
            Some(Resolution::hours(4))
        );
        let fine = Bounds::new(0, 100 * 3_600);
        assert_eq!(lod.incremental_target(&ladder, Resolution::hours(1), fine), None);
    }

    #[test]
    fn test_incremental_never_leaves_ladder() {
        let lod = LodController::default();
        let ladder = ladder();
        assert_eq!(
            lod.incremental_target(&ladder, Resolution::minutes(1), Bounds::new(0, 60)),
            None
        );
        let forever = Bounds::new(0, i64::MAX / 1_000);
        assert_eq!(lod.incremental_target(&ladder, Resolution::years(1), forever), None);
        assert_eq!(
            lod.incremental_target(&ladder, Resolution::minutes(7), forever),
            None
        );
    }

    #[test]
    fn test_thresholds_from_config() {
        let config = LodConfig {
            htf_threshold: 400,
            ltf_threshold: 20,
            step_base: 4,
            auto_resample: true,
        };
        let thresholds = LodThresholds::from(&config);
        assert_eq!(thresholds.htf, 400);
        assert_eq!(thresholds.ltf, 20);
        assert_eq!(thresholds.step_base, 4);
    }
}
