//! `choice-feed-engine` server
//!
//! Serves ranked, type-diversified social feeds over HTTP. Candidates and
//! viewer profiles are read from PostgreSQL; one `PgFeedStore` backs both
//! store seams of the pipeline.
//!
//! On SIGINT/SIGTERM the listener stops accepting, open feed requests finish,
//! and the pool is drained before exit.

use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use choice_feed::api::{self, AppState};
use choice_feed::error::Result;
use choice_feed::feed::{FeedPipeline, PgFeedStore};
use choice_feed::{Config, Database};

const DEFAULT_LOG_FILTER: &str =
    "choice_feed=debug,choice_feed_engine=debug,tower_http=debug,sqlx=warn,info";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("═══════════════════════════════════════════════════════════════");
    info!("  Choice Feed Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════════════════════════");

    #[cfg(feature = "prometheus")]
    init_metrics();

    let config = Config::from_env()?;
    info!("Configuration loaded and validated");

    let db = Database::new(&config.database).await?;
    info!("Database connection pool established");

    let store = Arc::new(PgFeedStore::new(db.clone(), &config.feed));
    let pipeline = FeedPipeline::new(store.clone(), store, &config.feed);

    let state = Arc::new(AppState {
        pipeline,
        db: Some(db.clone()),
        default_limit: config.feed.default_limit,
        max_limit: config.feed.max_limit,
    });

    info!("  API: http://{}:{}", config.api.host, config.api.port);
    info!(
        "  Health: http://{}:{}/health",
        config.api.host, config.api.port
    );

    api::start_server(state, &config.api, shutdown_signal()).await?;

    db.close().await;

    info!("Choice Feed Engine stopped gracefully");
    Ok(())
}

/// Initialize structured logging with tracing; `LOG_FORMAT=json` switches to JSON lines
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(std::env::var("NO_COLOR").is_err()),
            )
            .init();
    }
}

/// Install the Prometheus recorder and its scrape endpoint (`METRICS_PORT`, default 9091)
#[cfg(feature = "prometheus")]
fn init_metrics() {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let port: u16 = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(9091);

    match PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
    {
        Ok(()) => {
            choice_feed::feed::metrics::describe_metrics();
            info!("Prometheus metrics exporter listening on port {}", port);
        }
        Err(e) => tracing::warn!("Failed to install Prometheus exporter: {}", e),
    }
}

/// Resolves on the first of Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
