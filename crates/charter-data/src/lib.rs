//! Data loading utilities for charter.
//!
//! - `CsvLoader` - OHLCV CSV files with header detection
//! - `BinanceJsonLoader` - saved Binance kline arrays
//! - `BinanceFeed` - REST polling for candles newer than the loaded data

pub mod binance;
pub mod csv;
pub mod error;
pub mod live;
pub mod source;
pub mod validation;

pub use self::csv::{CsvLoader, GapReport};
pub use binance::{binance_interval, parse_klines, BinanceJsonLoader};
pub use error::DataError;
pub use live::{BinanceFeed, UpdateSource};
pub use source::DataSource;
