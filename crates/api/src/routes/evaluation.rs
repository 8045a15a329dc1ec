use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use common::{PerformanceRecord, SignalKind};
use edge::{compute_signal_edge, confidence_score, SignalEdgeStats};

use crate::{auth::require_eval_token, error::ApiError, routes::parse_days, AppState};

const MAX_STATS_DAYS: u32 = 365;

pub fn evaluation_router(state: AppState) -> Router<AppState> {
    let trigger = Router::new()
        .route("/api/evaluate-signals", post(evaluate_signals))
        .route_layer(middleware::from_fn_with_state(state, require_eval_token));

    Router::new()
        .route("/api/signal-stats", get(signal_stats))
        .merge(trigger)
}

// ─── Batch trigger ────────────────────────────────────────────────────────────

async fn evaluate_signals(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let report = state.evaluator.run_batch().await.map_err(|e| {
        error!(error = %e, "Evaluation batch could not read pending records");
        ApiError::from(e)
    })?;
    info!(updated = report.updated, "Evaluation triggered over HTTP");
    Ok(Json(json!({ "updated": report.updated })))
}

// ─── Edge statistics ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatsQuery {
    days: Option<String>,
}

#[derive(Debug, Serialize)]
struct SignalTypeStats {
    signal_type: SignalKind,
    confidence: Option<f64>,
    #[serde(flatten)]
    stats: SignalEdgeStats,
}

async fn signal_stats(
    State(state): State<AppState>,
    Query(q): Query<StatsQuery>,
) -> Result<Json<Vec<SignalTypeStats>>, ApiError> {
    let days = parse_days(q.days.as_deref(), MAX_STATS_DAYS);
    let cutoff = Utc::now() - Duration::days(i64::from(days));
    let records = state.store.evaluated_since(cutoff).await?;

    let mut by_type: BTreeMap<SignalKind, Vec<PerformanceRecord>> = BTreeMap::new();
    for record in records {
        by_type.entry(record.signal_type).or_default().push(record);
    }

    let out = by_type
        .into_iter()
        .map(|(signal_type, rows)| {
            let stats = compute_signal_edge(&rows);
            SignalTypeStats {
                signal_type,
                confidence: confidence_score(&stats),
                stats,
            }
        })
        .collect();
    Ok(Json(out))
}
