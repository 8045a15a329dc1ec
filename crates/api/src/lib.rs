mod auth;
mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use common::{CandleSource, RecordStore};
use tracker::{ForwardReturnEvaluator, Scanner, UniverseConfig};

pub use error::ApiError;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub candles: Arc<dyn CandleSource>,
    pub evaluator: Arc<ForwardReturnEvaluator>,
    pub scanner: Arc<Scanner>,
    pub universe: Arc<UniverseConfig>,
    /// Shared secret for the batch trigger; `None` leaves the trigger unusable.
    pub eval_token: Option<String>,
}

/// All routes with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::evaluation_router(state.clone()))
        .merge(routes::market_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(cors)
}

/// Build and run the Axum API server.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    info!(%addr, "API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
