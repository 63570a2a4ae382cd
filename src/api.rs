//! HTTP API Server for the feed
//!
//! Thin translation layer: query parameters in, [`FeedResult`] JSON out.
//! Errors render through [`Error`]'s `IntoResponse`.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::database::{Database, PoolStats};
use crate::error::{Error, Result};
use crate::feed::{FeedPipeline, FeedResult};

/// Shared application state
pub struct AppState {
    pub pipeline: FeedPipeline,
    /// Pinged by `/health` when present
    pub db: Option<Database>,
    pub default_limit: usize,
    pub max_limit: usize,
}

/// Query params for the feed endpoint
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl FeedQuery {
    /// Resolve `(page, limit)`: page defaults to 1, limit to `default_limit`
    /// and is clamped to `max_limit`. Values below 1 are rejected.
    pub fn resolve(&self, default_limit: usize, max_limit: usize) -> Result<(usize, usize)> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(Error::bad_request(format!("page must be >= 1, got {}", page)));
        }

        let limit = match self.limit {
            Some(limit) if limit < 1 => {
                return Err(Error::bad_request(format!("limit must be >= 1, got {}", limit)));
            }
            Some(limit) => usize::try_from(limit).unwrap_or(usize::MAX),
            None => default_limit,
        };

        let page = usize::try_from(page).unwrap_or(usize::MAX);
        Ok((page, limit.min(max_limit)))
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Connection pool occupancy; absent when running without a database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
}

/// Build the router with CORS, tracing and request timeout layers
pub fn router(state: Arc<AppState>, config: &ApiConfig) -> Router {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/feed/:viewer_id", get(get_feed))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout));

    let app = if config.cors_enabled {
        app.layer(cors_layer(&config.cors_origins))
    } else {
        app
    };

    app.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server; returns once `shutdown` resolves and in-flight requests drain
pub async fn start_server(
    state: Arc<AppState>,
    config: &ApiConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = router(state, config);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting feed API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(Error::internal)?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(Error::internal)?;

    info!("Feed API server stopped");
    Ok(())
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = match &state.db {
        Some(db) => match db.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        },
        None => true,
    };

    let (code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            pool: state.db.as_ref().map(Database::stats),
        }),
    )
}

/// Ranked, diversified feed page for a viewer
async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(viewer_id): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResult>> {
    let (page, limit) = query.resolve(state.default_limit, state.max_limit)?;
    let feed = state.pipeline.build_feed(&viewer_id, page, limit).await?;
    Ok(Json(feed))
}
