//! Order Engine Binary
//!
//! Starts the HTTP API and the evaluator/dispatcher worker pool.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-engine
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_ENGINE_CONFIG`: Path to the YAML config (default: config.yaml)
//! - `RUST_LOG`: Log filter, overrides `observability.logging.level`
//!
//! Any `${VAR}` referenced from the config file is read from the
//! environment, after `.env` has been loaded.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use order_engine::application::services::{OrderEngine, RetryController};
use order_engine::application::use_cases::{DispatchOrderUseCase, EvaluateTriggersUseCase};
use order_engine::config::{CONFIG_PATH_ENV, Config, load_config};
use order_engine::domain::quota::QuotaLedger;
use order_engine::domain::shared::Timestamp;
use order_engine::domain::triggers::TriggerEvaluator;
use order_engine::infrastructure::http::{AppState, create_router};
use order_engine::infrastructure::market_data::HttpMarketData;
use order_engine::infrastructure::persistence::{InMemoryOrderLedger, InMemoryQuotaLedger};
use order_engine::infrastructure::venue::HttpVenue;
use order_engine::observability::{MetricsConfig, init_logging, init_metrics};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Time allowed for workers to finish their current cycle.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

type Engine = OrderEngine<InMemoryOrderLedger, InMemoryQuotaLedger, HttpVenue, HttpMarketData>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path = std::env::var(CONFIG_PATH_ENV).ok();
    let config = load_config(config_path.as_deref()).context("failed to load configuration")?;

    init_logging(&config.observability.logging).context("failed to initialize logging")?;
    tracing::info!(
        http_port = config.server.http_port,
        workers = config.engine.workers,
        venue = %config.venue.base_url,
        market_data = %config.market_data.base_url,
        "Starting order engine"
    );

    if let Some(port) = config.server.metrics_port {
        init_metrics(&MetricsConfig::with_port(port)).context("failed to start metrics exporter")?;
        tracing::info!(port, "Metrics exporter listening");
    }

    let ledger = Arc::new(InMemoryOrderLedger::new());
    let quota = Arc::new(InMemoryQuotaLedger::new());
    seed_limits(&config, &quota).await?;

    let engine = Arc::new(create_engine(&config, &ledger, &quota)?);
    let workers = engine.start();

    let shutdown = CancellationToken::new();
    let server = tokio::spawn(serve_http(
        config.clone(),
        AppState::new(&ledger, &quota, env!("CARGO_PKG_VERSION")),
        shutdown.clone(),
    ));

    tracing::info!("Order engine ready");
    shutdown_signal().await;

    shutdown.cancel();
    engine.shutdown();

    let drain = async {
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "Worker task ended abnormally");
            }
        }
        match server.await {
            Ok(Err(e)) => tracing::error!(error = %e, "HTTP server error"),
            Err(e) => tracing::warn!(error = %e, "HTTP server task ended abnormally"),
            Ok(Ok(())) => {}
        }
    };
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Shutdown timed out, exiting"
        );
    }

    tracing::info!("Order engine stopped");
    Ok(())
}

/// Load .env from the current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Install the quota buckets declared in configuration.
async fn seed_limits(config: &Config, quota: &InMemoryQuotaLedger) -> anyhow::Result<()> {
    let now = Timestamp::now();
    for seed in &config.limits {
        let limit = quota
            .configure_limit(seed.to_settings(), now)
            .await
            .with_context(|| format!("invalid limit for user {}", seed.user_id))?;
        tracing::info!(
            limit_id = %limit.id,
            user_id = %limit.user_id,
            window = %limit.window,
            max_amount = %limit.max_amount,
            enforced = limit.enforced,
            "Quota limit seeded"
        );
    }
    Ok(())
}

/// Wire the worker pool to the HTTP venue and market data feed.
fn create_engine(
    config: &Config,
    ledger: &Arc<InMemoryOrderLedger>,
    quota: &Arc<InMemoryQuotaLedger>,
) -> anyhow::Result<Engine> {
    let venue = Arc::new(HttpVenue::new(&config.venue).context("failed to build venue client")?);
    let market_data = Arc::new(
        HttpMarketData::new(&config.market_data).context("failed to build market data client")?,
    );

    let evaluate = EvaluateTriggersUseCase::new(
        Arc::clone(ledger),
        market_data,
        TriggerEvaluator::new(config.engine.max_price_age()),
    );
    let dispatch = DispatchOrderUseCase::new(
        Arc::clone(ledger),
        Arc::clone(quota),
        venue,
        RetryController::new(config.retry.to_policy()),
    );

    Ok(OrderEngine::new(
        evaluate,
        dispatch,
        config.engine.to_settings(),
    ))
}

/// Serve the REST API until `shutdown` is cancelled.
async fn serve_http(
    config: Config,
    state: AppState<InMemoryOrderLedger, InMemoryQuotaLedger>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.http_port)
        .parse()
        .context("invalid bind address")?;

    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /api/v1/orders");
    tracing::info!("  GET  /api/v1/orders?user_id=&status=");
    tracing::info!("  GET  /api/v1/orders/{{order_id}}");
    tracing::info!("  POST /api/v1/orders/{{order_id}}/cancel");
    tracing::info!("  GET  /api/v1/orders/{{order_id}}/executions");
    tracing::info!("  PUT  /api/v1/limits");
    tracing::info!("  GET  /api/v1/limits?user_id=");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; a process that cannot
/// receive termination signals must not start.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
