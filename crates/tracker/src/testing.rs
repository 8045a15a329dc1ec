//! Test doubles shared by the tracker unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use common::{Candle, CandleSource, Error, Lookback, Result};

/// One bar per calendar day starting at `start`, flat OHLC around each close.
pub fn daily_series(start: DateTime<Utc>, closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            date: start + Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// In-memory candle source keyed by symbol. Unknown symbols return an empty series.
#[derive(Default)]
pub struct StubSource {
    series: HashMap<String, Vec<Candle>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn with(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.series.insert(symbol.to_string(), candles);
        self
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CandleSource for StubSource {
    async fn fetch(&self, symbol: &str, _lookback: Lookback) -> Result<Vec<Candle>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(symbol.to_string());
        }
        if self.failing.contains(symbol) {
            return Err(Error::DataSource(format!("{symbol}: unavailable")));
        }
        Ok(self.series.get(symbol).cloned().unwrap_or_default())
    }
}
