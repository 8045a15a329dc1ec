use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{ForwardMetrics, NewPerformanceRecord, PerformanceRecord, Result};

/// Result of an insert-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// A record with the same (symbol, signal_type, entry_time) already existed.
    Duplicate,
}

/// Durable home for performance records.
///
/// `insert_if_absent` must be atomic at the store layer (unique key plus a
/// conflict policy), never a read followed by a write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_if_absent(&self, record: &NewPerformanceRecord) -> Result<UpsertOutcome>;

    /// Unevaluated records with `entry_time <= entered_before`, at most
    /// `limit` of them. Records never attempted come first, then the least
    /// recently attempted, so a record that keeps failing cannot hold a
    /// batch slot forever.
    async fn unevaluated(
        &self,
        entered_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PerformanceRecord>>;

    /// Evaluated records with `entry_time >= cutoff`.
    async fn evaluated_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<PerformanceRecord>>;

    /// Writes the metrics and flips `evaluated`. Returns `false` when the
    /// record does not exist or was already evaluated.
    async fn mark_evaluated(&self, id: &str, metrics: &ForwardMetrics) -> Result<bool>;

    /// Stamps an evaluation attempt that left the record pending.
    async fn mark_attempted(&self, id: &str, at: DateTime<Utc>) -> Result<()>;
}
