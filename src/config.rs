//! Environment-driven configuration
//!
//! Every setting has a default matching production ranking behaviour, so an
//! empty environment (plus a reachable database) is a working setup. Values
//! that are present but unparsable are rejected rather than defaulted.
//!
//! ```no_run
//! # fn main() -> choice_feed::Result<()> {
//! let config = choice_feed::Config::from_env()?;
//! assert!(!config.feed.partitions.is_empty());
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::feed::diversity::DistributionConfig;
use crate::feed::model::ContentType;
use crate::feed::scorer::{ScoringConfig, ScoringWeights};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub feed: FeedConfig,
}

/// Pool settings for the feed database (`DATABASE_URL`, `DB_*`)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Also bounds how long a query waits for a free connection
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Prepared statements cached per connection
    pub statement_cache_size: usize,
}

/// HTTP listener settings (`API_*`)
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub host: String,
    /// Whole-request budget enforced by the router
    pub request_timeout: Duration,
    pub cors_enabled: bool,
    /// `*` allows any origin
    pub cors_origins: Vec<String>,
}

/// Feed pipeline configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Deadline for the concurrent candidate + viewer fetch
    pub fetch_timeout: Duration,
    /// Newest posts read from each partition
    pub max_candidates_per_partition: i64,
    /// Post partitions merged into one candidate pool
    pub partitions: Vec<String>,
    /// Page size when the caller gives none
    pub default_limit: usize,
    /// Largest page size served
    pub max_limit: usize,
    /// Attempts per store query
    pub store_max_retries: u32,
    /// Initial backoff between store attempts
    pub store_retry_delay: Duration,
    pub scoring: ScoringConfig,
    pub distribution: DistributionConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(5000),
            max_candidates_per_partition: 200,
            partitions: vec![
                "choice".to_string(),
                "restaurant".to_string(),
                "leisure".to_string(),
            ],
            default_limit: 10,
            max_limit: 100,
            store_max_retries: 3,
            store_retry_delay: Duration::from_millis(100),
            scoring: ScoringConfig::default(),
            distribution: DistributionConfig::default(),
        }
    }
}

impl Config {
    /// Read `.env` (if any) and the process environment, validate, and log a summary
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database: DatabaseConfig::from_env()?,
            api: ApiConfig::from_env()?,
            feed: FeedConfig::from_env()?,
        };

        config.validate()?;
        config.log_summary();

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(Error::InvalidConfig {
                key: "DATABASE_URL",
                message: "database URL cannot be empty".into(),
            });
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(Error::InvalidConfig {
                key: "DB_MAX_CONNECTIONS",
                message: format!(
                    "pool max {} is below pool min {}",
                    self.database.max_connections, self.database.min_connections
                )
                .into(),
            });
        }

        self.feed.validate()
    }

    /// One structured line per section; the DB password is masked
    fn log_summary(&self) {
        info!(
            url = %mask_url(&self.database.url),
            pool_min = self.database.min_connections,
            pool_max = self.database.max_connections,
            "database config"
        );
        info!(
            host = %self.api.host,
            port = self.api.port,
            cors = self.api.cors_enabled,
            "api config"
        );
        info!(
            partitions = %self.feed.partitions.join(","),
            fetch_timeout = ?self.feed.fetch_timeout,
            default_limit = self.feed.default_limit,
            max_limit = self.feed.max_limit,
            utc_offset_minutes = self.feed.scoring.utc_offset_minutes,
            "feed config"
        );
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url = get_env("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://postgres@localhost/choice_feed_dev".to_string());

        Ok(Self {
            url,
            max_connections: get_env_parsed_or("DB_MAX_CONNECTIONS", 20)?,
            min_connections: get_env_parsed_or("DB_MIN_CONNECTIONS", 5)?,
            connect_timeout: Duration::from_secs(get_env_parsed_or("DB_CONNECT_TIMEOUT_SECS", 30)?),
            idle_timeout: Duration::from_secs(get_env_parsed_or("DB_IDLE_TIMEOUT_SECS", 600)?),
            max_lifetime: Duration::from_secs(get_env_parsed_or("DB_MAX_LIFETIME_SECS", 3600)?),
            statement_cache_size: get_env_parsed_or("DB_STATEMENT_CACHE_SIZE", 100)?,
        })
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            port: get_env_parsed_or("API_PORT", 8080)?,
            host: get_env_or("API_HOST", "0.0.0.0"),
            request_timeout: Duration::from_secs(get_env_parsed_or("API_REQUEST_TIMEOUT_SECS", 30)?),
            cors_enabled: get_env_parsed_or("API_CORS_ENABLED", true)?,
            cors_origins: split_list(&get_env_or("API_CORS_ORIGINS", "*")),
        })
    }
}

impl FeedConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let scoring_defaults = ScoringConfig::default();
        let weight_defaults = ScoringWeights::default();

        let scoring = ScoringConfig {
            weights: ScoringWeights {
                interest: get_env_parsed_or("FEED_WEIGHT_INTEREST", weight_defaults.interest)?,
                social: get_env_parsed_or("FEED_WEIGHT_SOCIAL", weight_defaults.social)?,
                location: get_env_parsed_or("FEED_WEIGHT_LOCATION", weight_defaults.location)?,
                engagement: get_env_parsed_or("FEED_WEIGHT_ENGAGEMENT", weight_defaults.engagement)?,
                contextual: get_env_parsed_or("FEED_WEIGHT_CONTEXTUAL", weight_defaults.contextual)?,
            },
            distance_decay_per_km: get_env_parsed_or(
                "FEED_DISTANCE_DECAY_PER_KM",
                scoring_defaults.distance_decay_per_km,
            )?,
            recency_window_hours: get_env_parsed_or(
                "FEED_RECENCY_WINDOW_HOURS",
                scoring_defaults.recency_window_hours,
            )?,
            utc_offset_minutes: get_env_parsed_or(
                "FEED_UTC_OFFSET_MINUTES",
                scoring_defaults.utc_offset_minutes,
            )?,
        };

        let distribution = DistributionConfig {
            min_items: get_env_parsed_or(
                "FEED_DIVERSITY_MIN_ITEMS",
                defaults.distribution.min_items,
            )?,
            ..defaults.distribution.clone()
        };

        let partitions = match std::env::var("FEED_PARTITIONS") {
            Ok(raw) => split_list(&raw),
            Err(_) => defaults.partitions.clone(),
        };

        Ok(Self {
            fetch_timeout: Duration::from_millis(get_env_parsed_or(
                "FEED_FETCH_TIMEOUT_MS",
                defaults.fetch_timeout.as_millis() as u64,
            )?),
            max_candidates_per_partition: get_env_parsed_or(
                "FEED_MAX_CANDIDATES_PER_PARTITION",
                defaults.max_candidates_per_partition,
            )?,
            partitions,
            default_limit: get_env_parsed_or("FEED_DEFAULT_LIMIT", defaults.default_limit)?,
            max_limit: get_env_parsed_or("FEED_MAX_LIMIT", defaults.max_limit)?,
            store_max_retries: get_env_parsed_or("FEED_STORE_MAX_RETRIES", defaults.store_max_retries)?,
            store_retry_delay: Duration::from_millis(get_env_parsed_or(
                "FEED_STORE_RETRY_DELAY_MS",
                defaults.store_retry_delay.as_millis() as u64,
            )?),
            scoring,
            distribution,
        })
    }

    /// Validate feed settings
    pub fn validate(&self) -> Result<()> {
        if self.partitions.is_empty() {
            return Err(Error::InvalidConfig {
                key: "FEED_PARTITIONS",
                message: "at least one partition is required".into(),
            });
        }

        if self.default_limit < 1 || self.max_limit < self.default_limit {
            return Err(Error::InvalidConfig {
                key: "FEED_MAX_LIMIT",
                message: format!(
                    "need max_limit >= default_limit >= 1 (got {} and {})",
                    self.max_limit, self.default_limit
                )
                .into(),
            });
        }

        if self.max_candidates_per_partition < 1 {
            return Err(Error::InvalidConfig {
                key: "FEED_MAX_CANDIDATES_PER_PARTITION",
                message: "must be positive".into(),
            });
        }

        if self.store_max_retries < 1 {
            return Err(Error::InvalidConfig {
                key: "FEED_STORE_MAX_RETRIES",
                message: "at least one attempt is required".into(),
            });
        }

        let w = &self.scoring.weights;
        for (key, value) in [
            ("FEED_WEIGHT_INTEREST", w.interest),
            ("FEED_WEIGHT_SOCIAL", w.social),
            ("FEED_WEIGHT_LOCATION", w.location),
            ("FEED_WEIGHT_ENGAGEMENT", w.engagement),
            ("FEED_WEIGHT_CONTEXTUAL", w.contextual),
            ("FEED_DISTANCE_DECAY_PER_KM", self.scoring.distance_decay_per_km),
            ("FEED_RECENCY_WINDOW_HOURS", self.scoring.recency_window_hours),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig {
                    key,
                    message: format!("must be finite and non-negative (got {})", value).into(),
                });
            }
        }

        // FixedOffset accepts strictly less than a day either way
        if self.scoring.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(Error::InvalidConfig {
                key: "FEED_UTC_OFFSET_MINUTES",
                message: format!("out of range: {}", self.scoring.utc_offset_minutes).into(),
            });
        }

        let fractions = &self.distribution.default_fractions;
        let fraction_sum = fractions.sum();
        if (fraction_sum - 1.0).abs() > 1e-6
            || ContentType::ALL
                .iter()
                .any(|t| !fractions[*t].is_finite() || fractions[*t] < 0.0)
        {
            return Err(Error::config(format!(
                "default type fractions must be non-negative and sum to 1 (got {})",
                fraction_sum
            )));
        }

        Ok(())
    }
}

fn get_env(key: &'static str) -> Result<String> {
    std::env::var(key).map_err(|_| Error::MissingEnvVar { var: key })
}

fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable; unset means `default`, unparsable is an error
fn get_env_parsed_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| Error::InvalidConfig {
        key,
        message: format!("cannot parse {:?}: {}", value, e).into(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Mask the password of a connection URL
fn mask_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
        return url.to_string();
    };
    let Some(at_pos) = url[scheme_end..].find('@').map(|i| i + scheme_end) else {
        return url.to_string();
    };
    match url[scheme_end..at_pos].find(':') {
        Some(colon) => {
            let colon = colon + scheme_end;
            format!("{}****{}", &url[..=colon], &url[at_pos..])
        }
        None => url.to_string(),
    }
}
