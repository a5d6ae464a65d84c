//! Binance kline arrays, as saved to disk and as returned by `/api/v3/klines`.
//!
//! Each kline is a JSON array
//! `[open_time_ms, open, high, low, close, volume, close_time_ms, ...]` where
//! prices and volumes are usually strings. Only the first six fields are read.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use charter_core::{Candle, Resolution, TimeUnit};
use serde_json::Value;

use crate::error::DataError;
use crate::validation::retain_valid;
use crate::DataSource;

/// Loads a saved Binance kline array from a JSON file.
pub struct BinanceJsonLoader {
    path: PathBuf,
}

impl BinanceJsonLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for BinanceJsonLoader {
    fn load(&self) -> anyhow::Result<Vec<Candle>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let parsed = parse_klines(&text)
            .with_context(|| format!("parsing klines from {}", self.path.display()))?;
        let (mut candles, rejected) = retain_valid(parsed);
        if rejected > 0 {
            log::warn!("Skipped {} invalid klines in {}", rejected, self.path.display());
        }
        candles.sort_by_key(|c| c.time);
        log::info!("Loaded {} klines from {}", candles.len(), self.path.display());
        Ok(candles)
    }
}

/// Parses a JSON array of klines into candles stamped in seconds.
pub fn parse_klines(text: &str) -> Result<Vec<Candle>, DataError> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(text)?;
    rows.iter()
        .enumerate()
        .map(|(index, row)| parse_kline(index, row))
        .collect()
}

fn parse_kline(index: usize, row: &[Value]) -> Result<Candle, DataError> {
    if row.len() < 6 {
        return Err(DataError::MalformedKline {
            index,
            reason: format!("expected at least 6 fields, got {}", row.len()),
        });
    }
    let field = |i: usize| {
        number(&row[i]).ok_or_else(|| DataError::MalformedKline {
            index,
            reason: format!("field {i} is not a number: {}", row[i]),
        })
    };
    let open_time_ms = field(0)?;
    Ok(Candle::new(
        (open_time_ms / 1000.0).floor() as i64,
        field(1)?,
        field(2)?,
        field(3)?,
        field(4)?,
        field(5)?,
    ))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Binance's interval name for a resolution, if the exchange offers it.
pub fn binance_interval(resolution: Resolution) -> Option<&'static str> {
    let interval = match (resolution.unit(), resolution.count()) {
        (TimeUnit::Second, 1) => "1s",
        (TimeUnit::Minute, 1) => "1m",
        (TimeUnit::Minute, 3) => "3m",
        (TimeUnit::Minute, 5) => "5m",
        (TimeUnit::Minute, 15) => "15m",
        (TimeUnit::Minute, 30) => "30m",
        (TimeUnit::Hour, 1) => "1h",
        (TimeUnit::Hour, 2) => "2h",
        (TimeUnit::Hour, 4) => "4h",
        (TimeUnit::Hour, 6) => "6h",
        (TimeUnit::Hour, 8) => "8h",
        (TimeUnit::Hour, 12) => "12h",
        (TimeUnit::Day, 1) => "1d",
        (TimeUnit::Day, 3) => "3d",
        (TimeUnit::Week, 1) => "1w",
        (TimeUnit::Month, 1) => "1M",
        _ => return None,
    };
    Some(interval)
}
