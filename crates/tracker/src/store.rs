use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, warn};

use common::{
    Error, ForwardMetrics, NewPerformanceRecord, PerformanceRecord, RecordStore, Result,
    UpsertOutcome,
};

/// Fixed-width RFC 3339 so that text ordering in SQLite is chronological.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidRecord(format!("bad timestamp '{raw}': {e}")))
}

/// SQLite-backed [`RecordStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Single-connection in-memory database. Each call yields an independent store.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Record store ready");
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct PerformanceRow {
    id: String,
    user_id: Option<String>,
    symbol: String,
    signal_type: String,
    direction: String,
    entry_price: f64,
    entry_time: String,
    regime: String,
    return_3d: Option<f64>,
    return_7d: Option<f64>,
    return_14d: Option<f64>,
    mfe: Option<f64>,
    mae: Option<f64>,
    evaluated: bool,
    created_at: String,
}

impl TryFrom<PerformanceRow> for PerformanceRecord {
    type Error = Error;

    fn try_from(row: PerformanceRow) -> Result<Self> {
        Ok(PerformanceRecord {
            signal_type: row.signal_type.parse()?,
            direction: row.direction.parse()?,
            regime: row.regime.parse()?,
            entry_time: parse_ts(&row.entry_time)?,
            created_at: parse_ts(&row.created_at)?,
            id: row.id,
            user_id: row.user_id,
            symbol: row.symbol,
            entry_price: row.entry_price,
            return_3d: row.return_3d,
            return_7d: row.return_7d,
            return_14d: row.return_14d,
            mfe: row.mfe,
            mae: row.mae,
            evaluated: row.evaluated,
        })
    }
}

/// Rows that fail to decode are logged and left out rather than failing the read.
fn decode_rows(rows: Vec<PerformanceRow>) -> Vec<PerformanceRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match PerformanceRecord::try_from(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping undecodable performance row");
                    None
                }
            }
        })
        .collect()
}

const SELECT_COLUMNS: &str = "SELECT id, user_id, symbol, signal_type, direction, entry_price, \
     entry_time, regime, return_3d, return_7d, return_14d, mfe, mae, evaluated, created_at \
     FROM signal_performance";

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_if_absent(&self, record: &NewPerformanceRecord) -> Result<UpsertOutcome> {
        let id = uuid::Uuid::new_v4().to_string();
        let result = sqlx::query(
            "INSERT INTO signal_performance \
             (id, user_id, symbol, signal_type, direction, entry_price, entry_time, regime, evaluated, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?) \
             ON CONFLICT(symbol, signal_type, entry_time) DO NOTHING",
        )
        .bind(&id)
        .bind(record.user_id.as_deref())
        .bind(&record.symbol)
        .bind(record.signal_type.as_str())
        .bind(record.direction.to_string())
        .bind(record.entry_price)
        .bind(format_ts(record.entry_time))
        .bind(record.regime.as_str())
        .bind(format_ts(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Duplicate
        })
    }

    async fn unevaluated(
        &self,
        entered_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PerformanceRecord>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE evaluated = 0 AND entry_time <= ? \
             ORDER BY last_attempt_at IS NOT NULL, last_attempt_at ASC, created_at ASC, rowid ASC \
             LIMIT ?"
        );
        let rows: Vec<PerformanceRow> = sqlx::query_as(&sql)
            .bind(format_ts(entered_before))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        Ok(decode_rows(rows))
    }

    async fn evaluated_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<PerformanceRecord>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE evaluated = 1 AND entry_time >= ? ORDER BY entry_time ASC"
        );
        let rows: Vec<PerformanceRow> = sqlx::query_as(&sql)
            .bind(format_ts(cutoff))
            .fetch_all(&self.pool)
            .await?;
        Ok(decode_rows(rows))
    }

    async fn mark_evaluated(&self, id: &str, metrics: &ForwardMetrics) -> Result<bool> {
        let m = metrics.sanitized();
        let result = sqlx::query(
            "UPDATE signal_performance \
             SET return_3d = ?, return_7d = ?, return_14d = ?, mfe = ?, mae = ?, evaluated = 1 \
             WHERE id = ? AND evaluated = 0",
        )
        .bind(m.return_3d)
        .bind(m.return_7d)
        .bind(m.return_14d)
        .bind(m.mfe)
        .bind(m.mae)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_attempted(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE signal_performance SET last_attempt_at = ? WHERE id = ? AND evaluated = 0",
        )
        .bind(format_ts(at))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
