//! CSV data loading implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use charter_core::Candle;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::validation::validate_candle;
use crate::DataSource;

/// Loads candle data from CSV files.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for CsvLoader {
    fn load(&self) -> anyhow::Result<Vec<Candle>> {
        load_candles_from_csv(&self.path)
            .with_context(|| format!("loading candles from {}", self.path.display()))
    }
}

/// Parse a timestamp cell into unix seconds.
///
/// Accepts unix seconds or milliseconds (integer or float), RFC 3339, and
/// `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` in UTC.
pub fn parse_datetime(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<f64>() {
        if !ts.is_finite() {
            return None;
        }
        // Milliseconds have 13+ digits
        let secs = if ts.abs() > 1e12 { ts / 1000.0 } else { ts };
        return Some(secs.floor() as i64);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.and_utc().timestamp())
}

/// Load candles from a CSV file and log a gap analysis.
///
/// Supports multiple formats:
/// - Format 1: Timestamp,Open,High,Low,Close,Volume (BTC style)
/// - Format 2: Unix Timestamp,Date,Symbol,Open,High,Low,Close,Volume (ETH style)
pub fn load_candles_from_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Candle>> {
    let mut reader = csv::ReaderBuilder::new().delimiter(b',').from_path(path)?;

    // Detect format from headers
    let headers = reader.headers()?.clone();
    let headers_lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let column = |names: &[&str], default: usize| {
        headers_lower
            .iter()
            .position(|h| names.iter().any(|n| h == n))
            .unwrap_or(default)
    };

    let ts_col = headers_lower
        .iter()
        .position(|h| h.contains("timestamp") || h == "time" || h == "date")
        .unwrap_or(0);
    let open_col = column(&["open", "o"], 1);
    let high_col = column(&["high", "h"], 2);
    let low_col = column(&["low", "l"], 3);
    let close_col = column(&["close", "c"], 4);
    let volume_col = column(&["volume", "vol", "v"], 5);

    let mut candles = Vec::new();
    let mut rejected = 0usize;

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let field = |col: usize| record.get(col).unwrap_or("0").trim();

        let time = parse_datetime(field(ts_col))
            .with_context(|| format!("row {}: bad timestamp {:?}", row + 1, field(ts_col)))?;
        let parse = |col: usize| -> anyhow::Result<f64> {
            field(col)
                .parse::<f64>()
                .with_context(|| format!("row {}: bad number {:?}", row + 1, field(col)))
        };

        let candle = Candle::new(
            time,
            parse(open_col)?,
            parse(high_col)?,
            parse(low_col)?,
            parse(close_col)?,
            parse(volume_col)?,
        );
        if validate_candle(&candle) {
            candles.push(candle);
        } else {
            rejected += 1;
        }
    }

    if rejected > 0 {
        log::warn!("Skipped {} invalid candles", rejected);
    }

    // Sort by timestamp to ensure chronological order
    candles.sort_by_key(|c| c.time);

    let timestamps: Vec<i64> = candles.iter().map(|c| c.time).collect();
    if let Some(report) = analyze_data_gaps(&timestamps) {
        report.log();
    }

    Ok(candles)
}

/// Summary of missing data points in a time-sorted series.
#[derive(Debug, Clone, PartialEq)]
pub struct GapReport {
    pub points: usize,
    /// Most common spacing between neighbouring candles.
    pub expected_interval: i64,
    pub span_seconds: i64,
    pub gaps: usize,
    pub missing: i64,
    /// Largest gap in seconds and the time it starts at.
    pub largest_gap: Option<(i64, i64)>,
}

impl GapReport {
    /// Percentage of expected points actually present.
    pub fn coverage_pct(&self) -> f64 {
        let expected = self.span_seconds / self.expected_interval.max(1) + 1;
        self.points as f64 / expected as f64 * 100.0
    }

    pub fn log(&self) {
        log::info!(
            "{} candles, interval {}s, span {:.1} days, {} missing in {} gaps ({:.2}% coverage)",
            self.points,
            self.expected_interval,
            self.span_seconds as f64 / 86_400.0,
            self.missing,
            self.gaps,
            self.coverage_pct()
        );
        if let Some((gap, start)) = self.largest_gap {
            log::debug!(
                "Largest gap: {} seconds ({:.1} hours) at timestamp {}",
                gap,
                gap as f64 / 3600.0,
                start
            );
        }
    }
}

/// Analyze data for gaps and missing data points.
///
/// Returns `None` with fewer than two timestamps.
pub fn analyze_data_gaps(timestamps: &[i64]) -> Option<GapReport> {
    if timestamps.len() < 2 {
        return None;
    }

    let mut intervals: HashMap<i64, usize> = HashMap::new();
    for window in timestamps.windows(2) {
        *intervals.entry(window[1] - window[0]).or_insert(0) += 1;
    }

    // Most common interval; ties go to the shorter one
    let expected_interval = intervals
        .iter()
        .filter(|(interval, _)| **interval > 0)
        .max_by_key(|(interval, count)| (**count, std::cmp::Reverse(**interval)))
        .map(|(interval, _)| *interval)
        .unwrap_or(60);

    let mut gaps = 0;
    let mut missing = 0;
    let mut largest_gap: Option<(i64, i64)> = None;

    for window in timestamps.windows(2) {
        let diff = window[1] - window[0];
        if diff > expected_interval {
            gaps += 1;
            missing += diff / expected_interval - 1;
            if largest_gap.map_or(true, |(largest, _)| diff > largest) {
                largest_gap = Some((diff, window[0]));
            }
        }
    }

    Some(GapReport {
        points: timestamps.len(),
        expected_interval,
        span_seconds: timestamps[timestamps.len() - 1] - timestamps[0],
        gaps,
        missing,
        largest_gap,
    })
}
