use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use common::{Candle, CandleSource, Direction, Lookback, Result, Signal, SignalKind};

use crate::recorder::PerformanceRecorder;
use crate::universe::UniverseConfig;

/// Signals found for one symbol on its latest bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub symbol: String,
    pub signals: Vec<Signal>,
}

/// Runs detection over a symbol universe and records what it finds.
pub struct Scanner {
    source: Arc<dyn CandleSource>,
    recorder: Arc<PerformanceRecorder>,
}

impl Scanner {
    pub fn new(source: Arc<dyn CandleSource>, recorder: Arc<PerformanceRecorder>) -> Self {
        Self { source, recorder }
    }

    /// Fetch, detect and record one symbol. Recording failures never surface here.
    pub async fn scan_symbol(
        &self,
        symbol: &str,
        lookback: Lookback,
        user_id: Option<&str>,
    ) -> Result<(Vec<Signal>, Vec<Candle>)> {
        let candles = self.source.fetch(symbol, lookback).await?;
        let signals = signals::detect_all_signals(symbol, &candles);
        if !signals.is_empty() {
            self.recorder.record_all(user_id, &signals, &candles).await;
        }
        Ok((signals, candles))
    }

    /// Scan every symbol of the universe with bounded concurrency. Symbols
    /// whose fetch fails or which produce no signal are left out; the rest
    /// keep the universe order.
    pub async fn scan(&self, universe: &UniverseConfig) -> Vec<ScanResult> {
        let lookback = Lookback::Days(universe.lookback_days);

        // Owned symbols keep the spawned scan future `Send`.
        let symbols = universe.symbols.clone();
        let mut found: Vec<(usize, ScanResult)> = stream::iter(symbols.into_iter().enumerate())
            .map(|(i, symbol)| async move {
                match self.scan_symbol(&symbol, lookback, None).await {
                    Ok((signals, _)) if !signals.is_empty() => {
                        Some((i, ScanResult { symbol, signals }))
                    }
                    Ok(_) => None,
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Scan fetch failed, skipping symbol");
                        None
                    }
                }
            })
            .buffer_unordered(universe.concurrency.max(1))
            .filter_map(|r| async move { r })
            .collect()
            .await;

        found.sort_by_key(|(i, _)| *i);
        info!(
            symbols = universe.symbols.len(),
            with_signals = found.len(),
            "Universe scan complete"
        );
        found.into_iter().map(|(_, r)| r).collect()
    }
}

/// Keep only signals matching the filters, then reduce each symbol to its
/// single strongest signal (first one wins on equal severity). Symbols left
/// without a signal are dropped.
pub fn filter_scan_results(
    results: Vec<ScanResult>,
    kind: Option<SignalKind>,
    direction: Option<Direction>,
) -> Vec<ScanResult> {
    results
        .into_iter()
        .filter_map(|r| {
            let strongest = r
                .signals
                .into_iter()
                .filter(|s| kind.map_or(true, |k| s.kind() == k))
                .filter(|s| direction.map_or(true, |d| s.direction == d))
                .fold(None::<Signal>, |best, s| match best {
                    Some(b) if b.severity >= s.severity => Some(b),
                    _ => Some(s),
                })?;
            Some(ScanResult {
                symbol: r.symbol,
                signals: vec![strongest],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::testing::StubSource;
    use chrono::{Duration, TimeZone, Utc};
    use common::{RecordStore, Severity, SignalPayload};

    fn signal(symbol: &str, severity: Severity, direction: Direction, kind: SignalKind) -> Signal {
        let payload = match kind {
            SignalKind::TrendStart => SignalPayload::TrendStart {
                ema_short: 1.0,
                ema_long: 1.0,
                bars_ago: 1,
            },
            _ => SignalPayload::VolumeAnomaly {
                current_volume: 2.0,
                avg_volume_20: 1.0,
                volume_ratio: 2.0,
                price_change_pct: 0.0,
            },
        };
        Signal {
            symbol: symbol.into(),
            severity,
            direction,
            payload,
        }
    }

    fn results() -> Vec<ScanResult> {
        vec![
            ScanResult {
                symbol: "THYAO".into(),
                signals: vec![
                    signal("THYAO", Severity::Medium, Direction::Up, SignalKind::TrendStart),
                    signal("THYAO", Severity::Strong, Direction::Down, SignalKind::VolumeAnomaly),
                    signal("THYAO", Severity::Strong, Direction::Up, SignalKind::VolumeAnomaly),
                ],
            },
            ScanResult {
                symbol: "AKBNK".into(),
                signals: vec![signal("AKBNK", Severity::Weak, Direction::Down, SignalKind::TrendStart)],
            },
        ]
    }

    #[test]
    fn strongest_signal_per_symbol_first_wins_ties() {
        let filtered = filter_scan_results(results(), None, None);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].signals.len(), 1);
        assert_eq!(filtered[0].signals[0].severity, Severity::Strong);
        assert_eq!(filtered[0].signals[0].direction, Direction::Down);
    }

    #[test]
    fn filters_drop_empty_symbols() {
        let up = filter_scan_results(results(), None, Some(Direction::Up));
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].symbol, "THYAO");
        assert_eq!(up[0].signals[0].direction, Direction::Up);
        assert_eq!(up[0].signals[0].severity, Severity::Strong);

        let trend = filter_scan_results(results(), Some(SignalKind::TrendStart), None);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].signals[0].severity, Severity::Medium);

        let none = filter_scan_results(
            results(),
            Some(SignalKind::RsiDivergence),
            Some(Direction::Down),
        );
        assert!(none.is_empty());
    }

    /// 29 quiet rising bars then a 1% up day on 3.5x volume.
    fn volume_spike() -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut closes: Vec<f64> = (0..29).map(|i| 100.0 + 0.3 * i as f64).collect();
        let prev = closes[28];
        closes.push(prev * 1.01);
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                date: start + Duration::days(i as i64),
                open: c,
                high: c + 0.1,
                low: c - 0.1,
                close: c,
                volume: if i == 29 { 3500.0 } else { 1000.0 },
            })
            .collect()
    }

    #[tokio::test]
    async fn scan_records_signals_and_skips_failures() {
        let source = Arc::new(
            StubSource::default()
                .with("KCHOL", volume_spike())
                .with("QUIET", Vec::new())
                .failing("BROKEN"),
        );
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let recorder = Arc::new(PerformanceRecorder::new(source.clone(), store.clone(), "^XU100"));
        let scanner = Scanner::new(source.clone(), recorder);

        let universe = UniverseConfig {
            lookback_days: 90,
            concurrency: 2,
            symbols: vec!["BROKEN".into(), "KCHOL".into(), "QUIET".into()],
        };
        let found = scanner.scan(&universe).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol, "KCHOL");
        assert!(found[0]
            .signals
            .iter()
            .any(|s| s.kind() == SignalKind::VolumeAnomaly));

        let pending = store.unevaluated(Utc::now(), 10).await.unwrap();
        assert!(!pending.is_empty());
        assert!(pending.iter().all(|r| r.symbol == "KCHOL"));
        assert!(pending.iter().all(|r| r.entry_price == volume_spike()[29].close));
    }

    #[tokio::test]
    async fn scan_runs_on_a_spawned_task() {
        let source = Arc::new(StubSource::default().with("KCHOL", volume_spike()));
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let recorder = Arc::new(PerformanceRecorder::new(source.clone(), store, "^XU100"));
        let scanner = Arc::new(Scanner::new(source, recorder));
        let universe = Arc::new(UniverseConfig {
            symbols: vec!["KCHOL".into()],
            ..UniverseConfig::default()
        });

        let found = tokio::spawn(async move { scanner.scan(&universe).await })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol, "KCHOL");
    }
}
