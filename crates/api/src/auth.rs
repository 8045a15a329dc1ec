use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Guards the batch trigger with the shared `EVAL_TOKEN` bearer credential.
/// Rejects with 500 when no token is configured and 401 on a missing or
/// wrong one, before the handler runs.
pub async fn require_eval_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.eval_token.as_deref() else {
        warn!("Evaluation trigger called but EVAL_TOKEN is not configured");
        return ApiError::internal("evaluation token is not configured").into_response();
    };

    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(t) if t == expected => next.run(request).await,
        _ => ApiError::unauthorized().into_response(),
    }
}
