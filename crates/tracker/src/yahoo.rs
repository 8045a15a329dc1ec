use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use common::{Candle, CandleSource, Error, Lookback, Result};

const BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; edgewatch/0.1)";

/// Chart-API client for Yahoo Finance. Used for every candle fetch.
pub struct YahooClient {
    http: Client,
    base_url: Url,
    suffix: String,
}

impl YahooClient {
    /// `suffix` is appended to bare symbols, e.g. `.IS` for Borsa Istanbul.
    pub fn new(suffix: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        let base_url = Url::parse(BASE_URL).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            suffix: suffix.into(),
        })
    }

    /// Point the client at another host (a proxy, or a mock server in tests).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(base_url).map_err(|e| Error::Config(e.to_string()))?;
        Ok(self)
    }

    /// Trimmed, upper-cased, suffixed. Index tickers (`^XU100`) pass through.
    pub fn provider_symbol(&self, symbol: &str) -> String {
        let s = symbol.trim().to_uppercase();
        if s.starts_with('^') || self.suffix.is_empty() || s.ends_with(&self.suffix) {
            s
        } else {
            format!("{s}{}", self.suffix)
        }
    }

    fn chart_url(&self, symbol: &str, range: &str, interval: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base url '{}' cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut()
            .append_pair("range", range)
            .append_pair("interval", interval);
        Ok(url)
    }
}

/// Smallest chart range covering `days` of daily history.
fn range_for_days(days: u32) -> &'static str {
    match days {
        0..=5 => "5d",
        6..=30 => "1mo",
        31..=90 => "3mo",
        91..=180 => "6mo",
        _ => "1y",
    }
}

#[async_trait]
impl CandleSource for YahooClient {
    async fn fetch(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Candle>> {
        let (range, interval) = match lookback {
            Lookback::Days(days) => (range_for_days(days), "1d"),
            Lookback::Timeframe(tf) => tf.range_interval(),
        };
        let provider_symbol = self.provider_symbol(symbol);
        let url = self.chart_url(&provider_symbol, range, interval)?;

        debug!(symbol = %provider_symbol, range, interval, "Fetching chart");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::DataSource(format!(
                "{provider_symbol}: HTTP {status}"
            )));
        }

        let chart: ChartResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(symbol = %provider_symbol, error = %e, "Unreadable chart payload");
            e
        })?;
        parse_chart(&provider_symbol, chart, interval == "1d")
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartData>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn bar_date(ts: i64, daily: bool) -> Option<DateTime<Utc>> {
    let dt = DateTime::from_timestamp(ts, 0)?;
    if daily {
        Some(dt.date_naive().and_hms_opt(0, 0, 0)?.and_utc())
    } else {
        Some(dt)
    }
}

/// Turn a chart payload into a clean ascending series.
fn parse_chart(symbol: &str, resp: ChartResponse, daily: bool) -> Result<Vec<Candle>> {
    if let Some(err) = resp.chart.error {
        let detail = err
            .description
            .or(err.code)
            .unwrap_or_else(|| "unknown chart error".to_string());
        return Err(Error::DataSource(format!("{symbol}: {detail}")));
    }

    let Some(data) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let timestamps = data.timestamp.unwrap_or_default();
    let Some(quote) = data.indicators.and_then(|i| i.quote.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let mut candles: Vec<Candle> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let candle = Candle {
                date: bar_date(ts, daily)?,
                open: at(&quote.open, i)?,
                high: at(&quote.high, i)?,
                low: at(&quote.low, i)?,
                close: at(&quote.close, i)?,
                volume: at(&quote.volume, i).unwrap_or(0.0),
            };
            candle.is_valid().then_some(candle)
        })
        .collect();

    candles.sort_by_key(|c| c.date);
    // Keep the later of two bars sharing a date (the live bar repeats the last session).
    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(last) if last.date == candle.date => *last = candle,
            _ => deduped.push(candle),
        }
    }
    Ok(deduped)
}
