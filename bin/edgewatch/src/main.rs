use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{CandleSource, Config, RecordStore};
use tracker::{
    ForwardReturnEvaluator, PerformanceRecorder, Scanner, Scheduler, SqliteStore, UniverseConfig,
    YahooClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(
        port = cfg.api_port,
        index = %cfg.market_index_symbol,
        suffix = %cfg.symbol_suffix,
        "EdgeWatch starting"
    );
    if cfg.eval_token.is_none() {
        warn!("EVAL_TOKEN not set; POST /api/evaluate-signals will answer 500");
    }

    // ── Database ──────────────────────────────────────────────────────────────
    let store = Arc::new(
        SqliteStore::connect(&cfg.database_url)
            .await
            .context("failed to open record store")?,
    );
    let store_dyn: Arc<dyn RecordStore> = store;

    // ── Market data ───────────────────────────────────────────────────────────
    let candles: Arc<dyn CandleSource> = Arc::new(
        YahooClient::new(cfg.symbol_suffix.clone()).context("failed to build candle source")?,
    );

    // ── Universe ──────────────────────────────────────────────────────────────
    let universe = match UniverseConfig::load(&cfg.universe_path) {
        Ok(u) => {
            info!(path = %cfg.universe_path, symbols = u.symbols.len(), "Universe loaded");
            u
        }
        Err(e) => {
            warn!(path = %cfg.universe_path, error = %e, "No usable universe; scanning disabled");
            UniverseConfig::default()
        }
    };
    let universe = Arc::new(universe);

    // ── Tracker components ────────────────────────────────────────────────────
    let recorder = Arc::new(PerformanceRecorder::new(
        candles.clone(),
        store_dyn.clone(),
        cfg.market_index_symbol.clone(),
    ));
    let evaluator = Arc::new(ForwardReturnEvaluator::new(candles.clone(), store_dyn.clone()));
    let scanner = Arc::new(Scanner::new(candles.clone(), recorder));

    // ── Scheduler ─────────────────────────────────────────────────────────────
    let scheduled = Scheduler::new(
        evaluator.clone(),
        scanner.clone(),
        universe.clone(),
        Duration::from_secs(cfg.eval_interval_secs),
        Duration::from_secs(cfg.scan_interval_secs),
    )
    .start();

    // ── HTTP API ──────────────────────────────────────────────────────────────
    let api_state = api::AppState {
        store: store_dyn,
        candles,
        evaluator,
        scanner,
        universe,
        eval_token: cfg.eval_token.clone(),
    };
    let port = cfg.api_port;
    let server = tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(error = %e, "API server stopped");
        }
    });

    // Keep main alive
    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received. Exiting.");

    server.abort();
    for handle in scheduled {
        handle.abort();
    }
    Ok(())
}
