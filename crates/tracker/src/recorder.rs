use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use common::{
    Candle, CandleSource, Lookback, MarketRegime, NewPerformanceRecord, RecordStore, Signal,
    UpsertOutcome,
};

/// Days of index history fetched to classify the regime (EMA200 needs 200 bars).
pub const INDEX_LOOKBACK_DAYS: u32 = 250;

/// Turns detected signals into pending performance records.
///
/// Recording is best effort: every failure is logged and swallowed so the
/// caller's request path never sees it.
pub struct PerformanceRecorder {
    source: Arc<dyn CandleSource>,
    store: Arc<dyn RecordStore>,
    index_symbol: String,
}

impl PerformanceRecorder {
    pub fn new(
        source: Arc<dyn CandleSource>,
        store: Arc<dyn RecordStore>,
        index_symbol: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            index_symbol: index_symbol.into(),
        }
    }

    /// Regime of the reference index as of `as_of`; `Sideways` when the
    /// index cannot be fetched or is too short.
    pub async fn regime_at(&self, as_of: DateTime<Utc>) -> MarketRegime {
        match self
            .source
            .fetch(&self.index_symbol, Lookback::Days(INDEX_LOOKBACK_DAYS))
            .await
        {
            Ok(index) => signals::regime_at(&index, as_of),
            Err(e) => {
                warn!(index = %self.index_symbol, error = %e, "Index fetch failed, assuming sideways");
                MarketRegime::Sideways
            }
        }
    }

    /// Record one signal detected on `candles`.
    pub async fn record(
        &self,
        user_id: Option<&str>,
        signal: &Signal,
        candles: &[Candle],
    ) -> Option<UpsertOutcome> {
        self.record_all(user_id, std::slice::from_ref(signal), candles)
            .await
            .into_iter()
            .next()
    }

    /// Record every signal detected on the same series. The entry is the
    /// series' last bar and the regime is looked up once for all of them.
    /// Returns one outcome per signal actually written.
    pub async fn record_all(
        &self,
        user_id: Option<&str>,
        signals: &[Signal],
        candles: &[Candle],
    ) -> Vec<UpsertOutcome> {
        let directional: Vec<&Signal> = signals
            .iter()
            .filter(|s| {
                let keep = s.direction.is_directional();
                if !keep {
                    debug!(symbol = %s.symbol, kind = %s.kind(), "Neutral signal not recorded");
                }
                keep
            })
            .collect();
        if directional.is_empty() {
            return Vec::new();
        }

        let Some(entry) = candles.last() else {
            return Vec::new();
        };
        if !entry.close.is_finite() || entry.close <= 0.0 {
            warn!(close = entry.close, "Entry bar has no usable close, not recording");
            return Vec::new();
        }

        let regime = self.regime_at(entry.date).await;

        let mut outcomes = Vec::with_capacity(directional.len());
        for signal in directional {
            let record = NewPerformanceRecord {
                user_id: user_id.map(str::to_string),
                symbol: signal.symbol.clone(),
                signal_type: signal.kind(),
                direction: signal.direction,
                entry_price: entry.close,
                entry_time: entry.date,
                regime,
            };
            match self.store.insert_if_absent(&record).await {
                Ok(UpsertOutcome::Inserted) => {
                    info!(
                        symbol = %record.symbol,
                        signal_type = %record.signal_type,
                        direction = %record.direction,
                        regime = %regime,
                        entry_price = record.entry_price,
                        "Signal recorded"
                    );
                    outcomes.push(UpsertOutcome::Inserted);
                }
                Ok(UpsertOutcome::Duplicate) => {
                    debug!(symbol = %record.symbol, signal_type = %record.signal_type, "Signal already recorded");
                    outcomes.push(UpsertOutcome::Duplicate);
                }
                Err(e) => {
                    error!(symbol = %record.symbol, signal_type = %record.signal_type, error = %e, "Failed to record signal");
                }
            }
        }
        outcomes
    }
}
