//! Live updates: fetching candles newer than what a chart already holds.

use std::future::Future;
use std::time::Duration;

use charter_core::{Candle, Resolution};
use chrono::Utc;
use reqwest::Client;

use crate::binance::{binance_interval, parse_klines};
use crate::error::DataError;
use crate::validation::first_invalid;

/// Binance returns at most this many klines per request.
const KLINE_LIMIT: usize = 1000;

/// A source of candles newer than a given time, at the chart's native resolution.
///
/// Results may overlap what the chart already holds; the store deduplicates.
/// An empty result means nothing new.
pub trait UpdateSource: Send + Sync {
    fn fetch_after(
        &self,
        after: i64,
    ) -> impl Future<Output = Result<Vec<Candle>, DataError>> + Send;
}

/// Polls Binance's REST kline endpoint.
#[derive(Debug, Clone)]
pub struct BinanceFeed {
    http: Client,
    base_url: String,
    symbol: String,
    native: Resolution,
    interval: &'static str,
}

impl BinanceFeed {
    /// Create a feed for `symbol` at the chart's native resolution.
    pub fn new(
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        native: Resolution,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let interval = binance_interval(native).ok_or(DataError::UnsupportedInterval(native))?;
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("charter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            symbol: symbol.into().to_uppercase(),
            native,
            interval,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Millisecond `(startTime, endTime)` covering closed candles after `after`.
    ///
    /// Both ends step back one native bin: the start re-fetches the possibly
    /// unfinished last candle, the end skips the one still forming.
    pub fn request_window(&self, after: i64, now: i64) -> Option<(i64, i64)> {
        let bin = self.native.duration_seconds();
        let start = after - bin;
        let end = now - bin;
        (end > start).then(|| (start * 1000, end * 1000))
    }

    async fn fetch_page(&self, start_ms: i64, end_ms: i64) -> Result<Vec<Candle>, DataError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("symbol", self.symbol.clone()),
                ("interval", self.interval.to_string()),
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", KLINE_LIMIT.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DataError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        parse_klines(&body)
    }
}

impl UpdateSource for BinanceFeed {
    async fn fetch_after(&self, after: i64) -> Result<Vec<Candle>, DataError> {
        let Some((mut start_ms, end_ms)) = self.request_window(after, Utc::now().timestamp())
        else {
            return Ok(Vec::new());
        };

        let mut candles = Vec::new();
        loop {
            let page = self.fetch_page(start_ms, end_ms).await?;
            let full = page.len() >= KLINE_LIMIT;
            let last = page.last().map(|c| c.time);
            candles.extend(page);
            match last {
                Some(last) if full => start_ms = (last + 1) * 1000,
                _ => break,
            }
        }

        let candles = reject_invalid(candles)?;
        log::debug!("{}: fetched {} klines after {}", self.symbol, candles.len(), after);
        Ok(candles)
    }
}

/// Fails the whole batch if any kline breaks the candle invariants, so a bad
/// response never reaches the store.
fn reject_invalid(candles: Vec<Candle>) -> Result<Vec<Candle>, DataError> {
    match first_invalid(&candles) {
        Some(index) => Err(DataError::MalformedKline {
            index,
            reason: format!("invalid prices or volume: {:?}", candles[index]),
        }),
        None => Ok(candles),
    }
}
