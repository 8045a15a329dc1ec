use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::evaluator::ForwardReturnEvaluator;
use crate::scanner::Scanner;
use crate::universe::UniverseConfig;

/// In-process timer driving the evaluator batch and, optionally, the
/// universe scan. Each loop ticks once immediately, then every period.
/// Ticks missed while a run is in progress are skipped.
pub struct Scheduler {
    evaluator: Arc<ForwardReturnEvaluator>,
    scanner: Arc<Scanner>,
    universe: Arc<UniverseConfig>,
    eval_every: Duration,
    scan_every: Duration,
}

impl Scheduler {
    /// A zero period disables the corresponding loop.
    pub fn new(
        evaluator: Arc<ForwardReturnEvaluator>,
        scanner: Arc<Scanner>,
        universe: Arc<UniverseConfig>,
        eval_every: Duration,
        scan_every: Duration,
    ) -> Self {
        Self {
            evaluator,
            scanner,
            universe,
            eval_every,
            scan_every,
        }
    }

    /// Spawn the enabled loops. Call from inside a tokio runtime.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if self.eval_every.is_zero() {
            info!("Evaluation schedule disabled");
        } else {
            let evaluator = self.evaluator.clone();
            let period = self.eval_every;
            info!(every_secs = period.as_secs(), "Evaluation schedule started");
            handles.push(tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    // Failed batches are retried on the next tick.
                    if let Err(e) = evaluator.run_batch().await {
                        error!(error = %e, "Scheduled evaluation failed");
                    }
                }
            }));
        }

        if self.scan_every.is_zero() || self.universe.symbols.is_empty() {
            info!("Scan schedule disabled");
        } else {
            let scanner = self.scanner.clone();
            let universe = self.universe.clone();
            let period = self.scan_every;
            info!(
                every_secs = period.as_secs(),
                symbols = universe.symbols.len(),
                "Scan schedule started"
            );
            handles.push(tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    scanner.scan(&universe).await;
                }
            }));
        }

        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::PerformanceRecorder;
    use crate::store::SqliteStore;
    use crate::testing::{daily_series, StubSource};
    use chrono::{Duration as ChronoDuration, Utc};
    use common::{
        CandleSource, Direction, MarketRegime, NewPerformanceRecord, RecordStore, SignalKind,
    };

    async fn parts(
        source: StubSource,
    ) -> (Arc<SqliteStore>, Arc<ForwardReturnEvaluator>, Arc<Scanner>) {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let source: Arc<dyn CandleSource> = Arc::new(source);
        let recorder = Arc::new(PerformanceRecorder::new(source.clone(), store.clone(), "^XU100"));
        let evaluator = Arc::new(ForwardReturnEvaluator::new(source.clone(), store.clone()));
        let scanner = Arc::new(Scanner::new(source, recorder));
        (store, evaluator, scanner)
    }

    #[tokio::test]
    async fn zero_periods_spawn_nothing() {
        let (_, evaluator, scanner) = parts(StubSource::default()).await;
        let universe = Arc::new(UniverseConfig {
            symbols: vec!["THYAO".into()],
            ..UniverseConfig::default()
        });
        let handles =
            Scheduler::new(evaluator, scanner, universe, Duration::ZERO, Duration::ZERO).start();
        assert!(handles.is_empty());
    }

    #[tokio::test]
    async fn first_tick_runs_a_batch() {
        let now = Utc::now();
        let closes: Vec<f64> = (0..=30).map(|i| 100.0 + i as f64).collect();
        let history = daily_series(now - ChronoDuration::days(30), &closes);
        let (store, evaluator, scanner) = parts(StubSource::default().with("THYAO", history)).await;
        store
            .insert_if_absent(&NewPerformanceRecord {
                user_id: None,
                symbol: "THYAO".into(),
                signal_type: SignalKind::VolumeAnomaly,
                direction: Direction::Up,
                entry_price: 110.0,
                entry_time: now - ChronoDuration::days(20),
                regime: MarketRegime::Sideways,
            })
            .await
            .unwrap();

        let handles = Scheduler::new(
            evaluator,
            scanner,
            Arc::new(UniverseConfig::default()),
            Duration::from_secs(3600),
            Duration::ZERO,
        )
        .start();
        assert_eq!(handles.len(), 1);

        let mut evaluated = false;
        for _ in 0..100 {
            if store.unevaluated(Utc::now(), 10).await.unwrap().is_empty() {
                evaluated = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        for h in handles {
            h.abort();
        }
        assert!(evaluated);
    }
}
