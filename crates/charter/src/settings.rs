//! Per-chart settings resolved from configuration.

use charter_config::Config;
use charter_core::{FrequencyLadder, Resolution};

use crate::lod::LodThresholds;

/// Everything a chart needs from configuration, with tags already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    pub ladder: FrequencyLadder,
    pub thresholds: LodThresholds,
    pub auto_resample: bool,
    pub warm_on_start: bool,
    pub rewarm_after_update: bool,
    pub cut_partial_bins: bool,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            ladder: FrequencyLadder::standard(),
            thresholds: LodThresholds::default(),
            auto_resample: true,
            warm_on_start: true,
            rewarm_after_update: true,
            cut_partial_bins: false,
        }
    }
}

impl ChartSettings {
    pub fn from_config(config: &Config) -> charter_core::Result<Self> {
        let mut ladder = FrequencyLadder::from_tags(&config.ladder.resolutions)?;
        if let Some(custom) = &config.ladder.custom {
            ladder.insert_custom(custom.parse::<Resolution>()?)?;
        }
        Ok(Self {
            ladder,
            thresholds: LodThresholds::from(&config.lod),
            auto_resample: config.lod.auto_resample,
            warm_on_start: config.cache.warm_on_start,
            rewarm_after_update: config.cache.rewarm_after_update,
            cut_partial_bins: config.cache.cut_partial_bins,
        })
    }

    /// Settings without background warm-up, for short-lived charts.
    pub fn without_warmup(mut self) -> Self {
        self.warm_on_start = false;
        self.rewarm_after_update = false;
        self
    }
}
