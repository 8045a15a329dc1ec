use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use common::{Direction, Lookback, SignalKind, Timeframe};
use tracker::filter_scan_results;

use crate::{error::ApiError, routes::parse_days, AppState};

const MAX_CANDLE_DAYS: u32 = 365;

pub fn market_router() -> Router<AppState> {
    Router::new()
        .route("/api/signals/:symbol", get(symbol_signals))
        .route("/api/scan", get(scan))
        .route("/api/ohlcv", get(ohlcv))
}

// ─── Per-symbol signals ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SignalsQuery {
    days: Option<String>,
    user_id: Option<String>,
}

/// Detects on the latest bar and records what it finds. A failed fetch is
/// reported as "no signals", matching the detector's no-data behaviour.
async fn symbol_signals(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(q): Query<SignalsQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::bad_request("symbol is required"));
    }
    let days = parse_days(q.days.as_deref(), MAX_CANDLE_DAYS);

    let signals = match state
        .scanner
        .scan_symbol(&symbol, Lookback::Days(days), q.user_id.as_deref())
        .await
    {
        Ok((signals, _)) => signals,
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "Candle fetch failed");
            Vec::new()
        }
    };
    Ok(Json(json!({ "symbol": symbol, "signals": signals })))
}

// ─── Universe scan ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ScanQuery {
    #[serde(rename = "type")]
    signal_type: Option<String>,
    direction: Option<String>,
}

/// Empty and `all` mean "no filter".
fn parse_filter<T: std::str::FromStr>(raw: Option<&str>, name: &str) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("invalid {name} '{s}'"))),
    }
}

async fn scan(
    State(state): State<AppState>,
    Query(q): Query<ScanQuery>,
) -> Result<Json<Value>, ApiError> {
    let kind: Option<SignalKind> = parse_filter(q.signal_type.as_deref(), "type")?;
    let direction: Option<Direction> = parse_filter(q.direction.as_deref(), "direction")?;

    let results = state.scanner.scan(&state.universe).await;
    let filtered = filter_scan_results(results, kind, direction);
    Ok(Json(json!({ "results": filtered })))
}

// ─── Candles ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct OhlcvQuery {
    symbol: Option<String>,
    tf: Option<String>,
    days: Option<String>,
}

async fn ohlcv(
    State(state): State<AppState>,
    Query(q): Query<OhlcvQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = q
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("symbol is required (e.g. symbol=THYAO)"))?;

    let lookback = match q.tf.as_deref() {
        Some(tf) => Lookback::Timeframe(
            tf.parse::<Timeframe>()
                .map_err(|_| ApiError::bad_request(format!("invalid timeframe '{tf}'")))?,
        ),
        None => Lookback::Days(parse_days(q.days.as_deref(), MAX_CANDLE_DAYS)),
    };

    let candles = state.candles.fetch(symbol, lookback).await?;
    Ok(Json(json!({ "candles": candles })))
}
