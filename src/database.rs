//! PostgreSQL access for the feed stores
//!
//! Owns the shared `PgPool` (statement cache, slow-query logging, pool
//! bounds from [`DatabaseConfig`]) and the [`RetryPolicy`] that store queries
//! run under.

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
const SLOW_STATEMENT: Duration = Duration::from_secs(1);

/// Shared handle to the feed database; cheap to clone
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[instrument(skip(config))]
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip a trivial query; used by `/health`
    pub async fn health_check(&self) -> Result<()> {
        ping(&self.pool).await.map_err(|e| Error::Database {
            message: format!("Feed database unreachable: {}", e).into(),
            source: Some(e),
        })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }

    /// Wait for checked-out connections to return, then close the pool
    pub async fn close(&self) {
        debug!(size = self.pool.size(), "Draining feed database pool");
        self.pool.close().await;
        info!("Feed database pool closed");
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

async fn ping(pool: &PgPool) -> std::result::Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await.map(drop)
}

/// Build the pool and check one connection before handing it out
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    debug!(
        max = config.max_connections,
        min = config.min_connections,
        acquire_timeout = ?config.connect_timeout,
        "Opening feed database pool"
    );

    let connect_options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| Error::Config {
            message: format!("DB_URL is not a valid PostgreSQL URL: {}", e).into(),
            source: Some(Box::new(e)),
        })?
        .statement_cache_capacity(config.statement_cache_size)
        .log_statements(log::LevelFilter::Debug)
        .log_slow_statements(log::LevelFilter::Warn, SLOW_STATEMENT);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .max_lifetime(Some(config.max_lifetime))
        .connect_with(connect_options)
        .await
        .map_err(|e| Error::Database {
            message: format!("Cannot open feed database pool: {}", e).into(),
            source: Some(e),
        })?;

    ping(&pool).await.map_err(|e| Error::Database {
        message: format!("Feed database rejected the first query: {}", e).into(),
        source: Some(e),
    })?;

    info!(size = pool.size(), idle = pool.num_idle(), "Feed database pool ready");
    Ok(pool)
}

/// How store queries are retried after transient failures.
///
/// The delay doubles after each failed attempt, up to `max_delay`.
/// Errors for which [`Error::is_retryable`] is false are returned at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, initial_delay: Duration) -> Self {
        Self {
            attempts,
            initial_delay,
            max_delay: MAX_RETRY_DELAY,
        }
    }

    /// Backoff before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    /// At least one attempt is always made.
    pub async fn run<T, F, Fut>(&self, what: &'static str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt + 1 >= attempts => return Err(e),
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        what,
                        attempt = attempt + 1,
                        attempts,
                        ?delay,
                        "Transient failure, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(20), MAX_RETRY_DELAY);
        assert_eq!(policy.delay_for(u32::MAX), MAX_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let calls = &AtomicU32::new(0);
        let result = fast(3)
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::PoolExhausted)
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = fast(5)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::not_found("viewer", "v1"))
            })
            .await;

        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_last_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = fast(2)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::store("content", "connection reset"))
            })
            .await;

        assert!(matches!(result, Err(Error::Store { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = &AtomicU32::new(0);
        let result = fast(0)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pool_against_live_database() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };

        let config = DatabaseConfig {
            url,
            max_connections: 4,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(600),
            statement_cache_size: 16,
        };

        let db = Database::new(&config).await.unwrap();
        db.health_check().await.unwrap();
        assert!(db.stats().size >= 1);
        db.close().await;
    }
}
