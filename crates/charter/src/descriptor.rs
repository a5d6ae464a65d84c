//! Persisted description of a chart, enough to rebuild it from its source.

use std::path::{Path, PathBuf};

use charter_core::{Candle, Resolution};
use charter_data::{BinanceJsonLoader, CsvLoader, DataSource};
use serde::{Deserialize, Serialize};

/// Where a chart's raw candles come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    Csv {
        path: PathBuf,
    },
    /// A saved Binance kline array; the symbol enables live updates.
    BinanceJson {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        symbol: Option<String>,
    },
}

impl SourceRef {
    /// Picks a loader by file extension: `.json` is a Binance kline array.
    pub fn from_path<P: AsRef<Path>>(path: P, symbol: Option<String>) -> Self {
        let path = path.as_ref().to_path_buf();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            SourceRef::BinanceJson { path, symbol }
        } else {
            SourceRef::Csv { path }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SourceRef::Csv { path } | SourceRef::BinanceJson { path, .. } => path,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            SourceRef::Csv { .. } => None,
            SourceRef::BinanceJson { symbol, .. } => symbol.as_deref(),
        }
    }

    pub fn load(&self) -> anyhow::Result<Vec<Candle>> {
        match self {
            SourceRef::Csv { path } => CsvLoader::new(path).load(),
            SourceRef::BinanceJson { path, .. } => BinanceJsonLoader::new(path).load(),
        }
    }
}

/// Saved chart state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    pub label: String,
    pub native_resolution: Resolution,
    pub source: SourceRef,
}

impl ChartDescriptor {
    pub fn new(label: impl Into<String>, native_resolution: Resolution, source: SourceRef) -> Self {
        Self {
            label: label.into(),
            native_resolution,
            source,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
