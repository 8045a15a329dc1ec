use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::{Candle, Error, Result};

/// Named chart windows, each a fixed (range, interval) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    /// One session of 5-minute bars.
    Hour,
    /// Five sessions of 30-minute bars.
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Timeframe {
    /// Yahoo-style `(range, interval)` parameters.
    pub fn range_interval(self) -> (&'static str, &'static str) {
        match self {
            Timeframe::Hour => ("1d", "5m"),
            Timeframe::Day => ("5d", "30m"),
            Timeframe::Week => ("5d", "1d"),
            Timeframe::Month => ("1mo", "1d"),
            Timeframe::Quarter => ("3mo", "1d"),
            Timeframe::Year => ("1y", "1d"),
        }
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "1H" => Ok(Timeframe::Hour),
            "1G" => Ok(Timeframe::Day),
            "1W" => Ok(Timeframe::Week),
            "1A" => Ok(Timeframe::Month),
            "3A" => Ok(Timeframe::Quarter),
            "1Y" => Ok(Timeframe::Year),
            other => Err(Error::Config(format!("unknown timeframe '{other}'"))),
        }
    }
}

/// How much history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Days(u32),
    Timeframe(Timeframe),
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::Days(d) => write!(f, "{d}d"),
            Lookback::Timeframe(tf) => write!(f, "{tf:?}"),
        }
    }
}

/// Abstraction over the market data provider.
///
/// `YahooClient` in `crates/tracker` implements this against the chart API.
/// Implementations normalise exchange suffixes themselves and return bars
/// sorted ascending by date with no duplicates. Callers treat both an empty
/// series and an `Err` as "no data".
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Candle>>;
}
