use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use common::{
    Candle, CandleSource, Direction, Error, ForwardMetrics, Horizon, Lookback, PerformanceRecord,
    RecordStore, Result,
};

/// Records read per batch.
pub const BATCH_LIMIT: usize = 200;
/// A record must be at least this old before it is measured.
pub const MATURITY_DAYS: i64 = 14;
/// Daily history requested per record; comfortably covers entry plus 14 days.
pub const HISTORY_LOOKBACK_DAYS: u32 = 120;

/// Counts from one evaluator batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub scanned: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Updated,
    Skipped(&'static str),
}

/// Direction-aware return from `entry` to `price`. Up profits when price
/// rises, down when it falls.
fn directional_return(entry: f64, price: f64, direction: Direction) -> Option<f64> {
    let r = match direction {
        Direction::Up => (price - entry) / entry,
        Direction::Down => (entry - price) / entry,
        Direction::Neutral => return None,
    };
    r.is_finite().then_some(r)
}

/// Return at the close of the first bar dated on or after `entry_time + days`.
/// `None` when no such bar exists yet.
pub fn horizon_return(
    entry_price: f64,
    entry_time: DateTime<Utc>,
    direction: Direction,
    after_entry: &[Candle],
    days: i64,
) -> Option<f64> {
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return None;
    }
    let target = entry_time + Duration::days(days);
    let bar = after_entry
        .iter()
        .filter(|c| c.date >= target)
        .min_by_key(|c| c.date)?;
    if !bar.close.is_finite() {
        return None;
    }
    directional_return(entry_price, bar.close, direction)
}

/// Maximum favourable and maximum adverse excursion over every bar in
/// `after_entry`. Bars with a non-finite high or low are ignored.
pub fn excursions(
    entry_price: f64,
    direction: Direction,
    after_entry: &[Candle],
) -> (Option<f64>, Option<f64>) {
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return (None, None);
    }
    let mut mfe: Option<f64> = None;
    let mut mae: Option<f64> = None;

    for c in after_entry {
        if !c.high.is_finite() || !c.low.is_finite() {
            continue;
        }
        let (favourable, adverse) = match direction {
            Direction::Up => (
                directional_return(entry_price, c.high, direction),
                directional_return(entry_price, c.low, direction),
            ),
            Direction::Down => (
                directional_return(entry_price, c.low, direction),
                directional_return(entry_price, c.high, direction),
            ),
            Direction::Neutral => return (None, None),
        };
        if let Some(f) = favourable {
            mfe = Some(mfe.map_or(f, |m| m.max(f)));
        }
        if let Some(a) = adverse {
            mae = Some(mae.map_or(a, |m| m.min(a)));
        }
    }
    (mfe, mae)
}

/// All forward metrics of a record given the bars dated at or after its entry.
pub fn forward_metrics(record: &PerformanceRecord, after_entry: &[Candle]) -> ForwardMetrics {
    let ret = |h: Horizon| {
        horizon_return(
            record.entry_price,
            record.entry_time,
            record.direction,
            after_entry,
            h.days(),
        )
    };
    let (mfe, mae) = excursions(record.entry_price, record.direction, after_entry);
    ForwardMetrics {
        return_3d: ret(Horizon::D3),
        return_7d: ret(Horizon::D7),
        return_14d: ret(Horizon::D14),
        mfe,
        mae,
    }
    .sanitized()
}

/// Batch job that measures matured, unevaluated records and writes their
/// outcome exactly once.
pub struct ForwardReturnEvaluator {
    source: Arc<dyn CandleSource>,
    store: Arc<dyn RecordStore>,
    batch_limit: usize,
}

impl ForwardReturnEvaluator {
    pub fn new(source: Arc<dyn CandleSource>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            source,
            store,
            batch_limit: BATCH_LIMIT,
        }
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Run one batch against the current time.
    pub async fn run_batch(&self) -> Result<BatchReport> {
        self.run_batch_at(Utc::now()).await
    }

    /// Run one batch as of `now`. Only records at least [`MATURITY_DAYS`]
    /// old are read. Only a failure to read them is returned as an error;
    /// per-record failures are logged and counted, and the record stays
    /// pending behind records not yet attempted.
    pub async fn run_batch_at(&self, now: DateTime<Utc>) -> Result<BatchReport> {
        let matured_before = now - Duration::days(MATURITY_DAYS);
        let pending = self
            .store
            .unevaluated(matured_before, self.batch_limit)
            .await?;
        let mut report = BatchReport {
            scanned: pending.len(),
            ..BatchReport::default()
        };

        for record in &pending {
            match self.evaluate_one(record, now).await {
                Ok(Outcome::Updated) => report.updated += 1,
                Ok(Outcome::Skipped(reason)) => {
                    debug!(id = %record.id, symbol = %record.symbol, reason, "Record skipped");
                    report.skipped += 1;
                    self.note_attempt(record, now).await;
                }
                Err(e) => {
                    warn!(id = %record.id, symbol = %record.symbol, error = %e, "Record evaluation failed");
                    report.failed += 1;
                    self.note_attempt(record, now).await;
                }
            }
        }

        info!(
            scanned = report.scanned,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "Evaluation batch complete"
        );
        Ok(report)
    }

    async fn note_attempt(&self, record: &PerformanceRecord, now: DateTime<Utc>) {
        if let Err(e) = self.store.mark_attempted(&record.id, now).await {
            warn!(id = %record.id, error = %e, "Failed to stamp evaluation attempt");
        }
    }

    async fn evaluate_one(&self, record: &PerformanceRecord, now: DateTime<Utc>) -> Result<Outcome> {
        if record.symbol.trim().is_empty() {
            return Ok(Outcome::Skipped("empty symbol"));
        }
        if !record.direction.is_directional() {
            return Ok(Outcome::Skipped("neutral direction"));
        }
        if !record.entry_price.is_finite() || record.entry_price <= 0.0 {
            return Ok(Outcome::Skipped("invalid entry price"));
        }
        if now - record.entry_time < Duration::days(MATURITY_DAYS) {
            return Ok(Outcome::Skipped("not yet matured"));
        }

        let candles = self
            .source
            .fetch(record.symbol.trim(), Lookback::Days(HISTORY_LOOKBACK_DAYS))
            .await?;
        if candles.is_empty() {
            return Ok(Outcome::Skipped("no candles"));
        }

        let after_entry: Vec<Candle> = candles
            .into_iter()
            .filter(|c| c.date >= record.entry_time)
            .collect();
        if after_entry.is_empty() {
            return Ok(Outcome::Skipped("no bars after entry"));
        }

        let metrics = forward_metrics(record, &after_entry);
        debug!(
            id = %record.id,
            bars = after_entry.len(),
            return_3d = ?metrics.return_3d,
            return_14d = ?metrics.return_14d,
            mfe = ?metrics.mfe,
            mae = ?metrics.mae,
            "Forward metrics computed"
        );

        if self.store.mark_evaluated(&record.id, &metrics).await? {
            Ok(Outcome::Updated)
        } else {
            Err(Error::InvalidRecord(format!(
                "{} was already evaluated or no longer exists",
                record.id
            )))
        }
    }
}
