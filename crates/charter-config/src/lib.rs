//! Configuration management for charter.
//!
//! Loads configuration from TOML files: level-of-detail thresholds, the
//! frequency ladder, cache warm-up and live-update polling.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub lod: LodConfig,
    pub ladder: LadderConfig,
    pub cache: CacheConfig,
    pub live: LiveConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default locations.
    ///
    /// Searches in order:
    /// 1. `./config.toml`
    /// 2. `~/.config/charter/config.toml`
    ///
    /// Returns default config if no file found.
    pub fn load_default() -> Self {
        if let Ok(config) = Self::load(Self::default_path()) {
            return config;
        }

        if let Some(config_path) = Self::user_config_path() {
            if let Ok(config) = Self::load(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Like [`load_default`](Self::load_default), but a config file that
    /// exists and fails to read or parse is an error instead of being skipped.
    pub fn try_load_default() -> Result<Self, ConfigError> {
        let mut candidates = vec![Self::default_path()];
        candidates.extend(Self::user_config_path());
        Self::load_first(&candidates)
    }

    /// Loads the first of `paths` that exists; defaults when none does.
    pub fn load_first<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ConfigError> {
        for path in paths {
            let path: &Path = path.as_ref();
            if path.is_file() {
                return Self::load(path);
            }
        }
        Ok(Self::default())
    }

    /// Save configuration to a file path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Per-user config file, if the platform has a config directory.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("charter").join("config.toml"))
    }
}

/// General application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Native resolution assumed for data files that do not declare one.
    pub default_resolution: String,
    /// Label used when none is given.
    pub default_label: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_resolution: "1min".to_string(),
            default_label: "no_label".to_string(),
        }
    }
}

/// Level-of-detail thresholds, in candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Step to a coarser resolution when more candles than this would be visible.
    pub htf_threshold: u32,
    /// Step to a finer resolution when fewer candles than this would be visible.
    pub ltf_threshold: u32,
    /// Assumed size ratio between neighbouring rungs when jumping abruptly.
    pub step_base: u32,
    /// Re-target on every viewport change.
    pub auto_resample: bool,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            htf_threshold: 800,
            ltf_threshold: 50,
            step_base: 5,
            auto_resample: true,
        }
    }
}

/// Frequency ladder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    /// Resolution tags, finest first.
    pub resolutions: Vec<String>,
    /// Optional extra resolution inserted at its rank.
    pub custom: Option<String>,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            resolutions: ["1min", "5min", "15min", "1h", "4h", "1d", "1w", "1M", "1y"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            custom: None,
        }
    }
}

/// Resample cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Precompute every ladder resolution in the background on chart creation.
    pub warm_on_start: bool,
    /// Precompute again after a live update cleared the cache.
    pub rewarm_after_update: bool,
    /// Drop short first/last bins when resampling.
    pub cut_partial_bins: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            warm_on_start: true,
            rewarm_after_update: true,
            cut_partial_bins: false,
        }
    }
}

/// Live-update polling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Whether live updates are started for charts with a symbol.
    pub enabled: bool,
    /// Seconds between polls.
    pub interval_secs: u64,
    /// REST base URL of the kline endpoint.
    pub base_url: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 60,
            base_url: "https://api.binance.com".to_string(),
            timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.lod.htf_threshold, 800);
        assert_eq!(config.lod.ltf_threshold, 50);
        assert_eq!(config.ladder.resolutions.len(), 9);
        assert_eq!(config.live.interval_secs, 60);
        assert!(!config.live.enabled);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[lod]
htf_threshold = 1000

[ladder]
resolutions = ["1min", "1h", "1d"]
custom = "2h"

[live]
enabled = true
interval_secs = 30
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.lod.htf_threshold, 1000);
        assert_eq!(config.lod.ltf_threshold, 50);
        assert_eq!(config.ladder.resolutions, ["1min", "1h", "1d"]);
        assert_eq!(config.ladder.custom.as_deref(), Some("2h"));
        assert!(config.live.enabled);
        assert_eq!(config.live.interval_secs, 30);
        assert!(config.cache.warm_on_start);
        assert!(!config.cache.cut_partial_bins);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.general.default_label = "BTCUSDT".to_string();
        config.lod.auto_resample = false;
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/definitely/not/here.toml"),
            Err(ConfigError::ReadError(_))
        ));
    }

    #[test]
    fn test_load_first_picks_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("config.toml");
        std::fs::write(&present, "[lod]\nhtf_threshold = 600\n").unwrap();

        let config = Config::load_first(&[&missing, &present]).unwrap();
        assert_eq!(config.lod.htf_threshold, 600);
        assert_eq!(Config::load_first(&[&missing]).unwrap(), Config::default());
    }

    #[test]
    fn test_load_first_reports_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("config.toml");
        std::fs::write(&broken, "[lod\nhtf_threshold = ").unwrap();
        assert!(matches!(
            Config::load_first(&[&broken]),
            Err(ConfigError::ParseError(_))
        ));
    }
}
