//! Feed Metrics and Performance Monitoring
//!
//! Per-request summaries for feed builds, plus counters and histograms
//! published through the `metrics` facade (exported by the Prometheus
//! recorder when the `prometheus` feature is enabled).

use serde::Serialize;
use std::time::Instant;

use super::model::{PerType, Typed};

pub const FEED_REQUESTS_TOTAL: &str = "feed_requests_total";
pub const FEED_BUILD_DURATION_MS: &str = "feed_build_duration_ms";
pub const FEED_EVENTS_EXPIRED_TOTAL: &str = "feed_events_expired_total";

/// Metrics for a single feed build
#[derive(Debug, Clone, Serialize)]
pub struct FeedMetrics {
    pub viewer_id: String,
    pub request_id: String,
    pub timestamp: i64,

    // Performance
    pub total_duration_ms: u64,
    pub fetch_duration_ms: u64,
    pub scoring_duration_ms: u64,

    // Volume
    pub candidates_fetched: usize,
    pub expired_events: usize,
    pub eligible: usize,
    pub returned: usize,

    // Quality
    pub avg_score: f64,
    pub page_distribution: PerType<usize>,
}

impl FeedMetrics {
    pub fn new(viewer_id: &str) -> Self {
        Self {
            viewer_id: viewer_id.to_string(),
            request_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            total_duration_ms: 0,
            fetch_duration_ms: 0,
            scoring_duration_ms: 0,
            candidates_fetched: 0,
            expired_events: 0,
            eligible: 0,
            returned: 0,
            avg_score: 0.0,
            page_distribution: PerType::default(),
        }
    }

    /// Fill in the returned-page figures
    pub fn record_page<T: Typed>(&mut self, page: &[T], score: impl Fn(&T) -> f64) {
        self.returned = page.len();
        self.page_distribution = PerType::default();
        for item in page {
            self.page_distribution[item.content_type()] += 1;
        }
        self.avg_score = if page.is_empty() {
            0.0
        } else {
            page.iter().map(&score).sum::<f64>() / page.len() as f64
        };
    }

    /// Publish counters and histograms for this build
    pub fn publish(&self) {
        metrics::counter!(FEED_REQUESTS_TOTAL, "outcome" => "ok").increment(1);
        metrics::counter!(FEED_EVENTS_EXPIRED_TOTAL).increment(self.expired_events as u64);
        metrics::histogram!(FEED_BUILD_DURATION_MS).record(self.total_duration_ms as f64);
    }

    /// Potential problems worth a look
    pub fn detect_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.total_duration_ms > 200 {
            issues.push(format!("Slow feed build: {}ms", self.total_duration_ms));
        }

        if self.candidates_fetched > 0 && self.expired_events * 2 > self.candidates_fetched {
            issues.push(format!(
                "Mostly expired events: {}/{}",
                self.expired_events, self.candidates_fetched
            ));
        }

        if self.returned >= 4 {
            let dominant = self.page_distribution.iter().map(|(_, n)| *n).max().unwrap_or(0);
            if dominant == self.returned {
                issues.push("Single content type page".to_string());
            }
        }

        issues
    }
}

/// Register descriptions with the installed recorder
pub fn describe_metrics() {
    metrics::describe_counter!(FEED_REQUESTS_TOTAL, "Feed builds by outcome");
    metrics::describe_counter!(
        FEED_EVENTS_EXPIRED_TOTAL,
        "Event candidates dropped because they already ended"
    );
    metrics::describe_histogram!(
        FEED_BUILD_DURATION_MS,
        metrics::Unit::Milliseconds,
        "End-to-end feed build latency"
    );
}

/// Record a failed feed build
pub fn record_failure(error_code: &'static str) {
    metrics::counter!(FEED_REQUESTS_TOTAL, "outcome" => error_code).increment(1);
}

/// Performance timer for tracking operation duration
pub struct PerformanceTimer {
    start: Instant,
    label: &'static str,
}

impl PerformanceTimer {
    pub fn new(label: &'static str) -> Self {
        Self {
            start: Instant::now(),
            label,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn log_if_slow(&self, threshold_ms: u64) {
        let elapsed = self.elapsed_ms();
        if elapsed > threshold_ms {
            tracing::warn!(
                "Slow operation: {} took {}ms (threshold: {}ms)",
                self.label,
                elapsed,
                threshold_ms
            );
        }
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        tracing::debug!("{} completed in {}ms", self.label, self.elapsed_ms());
    }
}
