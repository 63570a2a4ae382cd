//! Feed Pipeline
//!
//! One feed request end to end:
//!
//! ```text
//! fetch (candidates ∥ viewer) → drop ended events → score → rank → diversify → page
//! ```
//!
//! Store calls run concurrently under a single timeout; any failure aborts the
//! request. Everything after the fetch is call-scoped and synchronous, with
//! scoring fanned out over rayon on the blocking pool.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::diversity::DiversityDistributor;
use super::metrics::{self, FeedMetrics, PerformanceTimer};
use super::model::{CandidateItem, ContentType, ScoredItem, Viewer};
use super::ranker;
use super::scorer::ItemScorer;
use super::temporal::local_time;
use crate::config::FeedConfig;
use crate::error::{Error, Result};

/// Source of feed-eligible items for a viewer
///
/// No ordering is required; items may come from several partitions merged together.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_candidates(&self, viewer_id: &str) -> Result<Vec<CandidateItem>>;
}

/// Source of viewer profiles. Unknown viewers fail with [`Error::NotFound`].
#[async_trait]
pub trait ViewerStore: Send + Sync {
    async fn fetch_viewer(&self, viewer_id: &str) -> Result<Viewer>;
}

/// One page of a ranked, diversified feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedResult {
    pub items: Vec<ScoredItem>,
    pub page: usize,
    pub limit: usize,
    /// Eligible items before pagination
    pub total: usize,
    pub has_more: bool,
}

#[derive(Clone)]
pub struct FeedPipeline {
    content: Arc<dyn ContentStore>,
    viewers: Arc<dyn ViewerStore>,
    scorer: ItemScorer,
    distributor: DiversityDistributor,
    fetch_timeout: Duration,
}

impl FeedPipeline {
    pub fn new(
        content: Arc<dyn ContentStore>,
        viewers: Arc<dyn ViewerStore>,
        config: &FeedConfig,
    ) -> Self {
        Self {
            content,
            viewers,
            scorer: ItemScorer::new(config.scoring.clone()),
            distributor: DiversityDistributor::new(config.distribution.clone()),
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// Build page `page` (1-based) of `limit` items for `viewer_id`
    pub async fn build_feed(&self, viewer_id: &str, page: usize, limit: usize) -> Result<FeedResult> {
        self.build_feed_at(viewer_id, page, limit, Utc::now()).await
    }

    /// Same as [`build_feed`](Self::build_feed) with an explicit clock
    #[instrument(skip(self, viewer_id, now), fields(viewer_id = %viewer_id))]
    pub async fn build_feed_at(
        &self,
        viewer_id: &str,
        page: usize,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<FeedResult> {
        let result = self.run(viewer_id, page, limit, now).await;
        if let Err(e) = &result {
            metrics::record_failure(e.error_code());
            warn!(code = e.error_code(), "feed build failed: {}", e);
        }
        result
    }

    async fn run(
        &self,
        viewer_id: &str,
        page: usize,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<FeedResult> {
        if page < 1 {
            return Err(Error::bad_request("page must be >= 1"));
        }
        if limit < 1 {
            return Err(Error::bad_request("limit must be >= 1"));
        }

        let timer = PerformanceTimer::new("build_feed");
        let mut report = FeedMetrics::new(viewer_id);

        let (candidates, viewer) = self.fetch(viewer_id).await?;
        report.fetch_duration_ms = timer.elapsed_ms();
        report.candidates_fetched = candidates.len();

        let local_now = local_time(now, self.scorer.config().offset());
        let eligible: Vec<CandidateItem> = candidates
            .into_iter()
            .filter(|item| !is_expired_event(item, local_now))
            .collect();
        report.expired_events = report.candidates_fetched - eligible.len();
        report.eligible = eligible.len();
        let total = eligible.len();

        let viewer = Arc::new(viewer);
        let scoring_started = timer.elapsed_ms();
        let scored = self.score_all(Arc::clone(&viewer), eligible, now).await?;
        report.scoring_duration_ms = timer.elapsed_ms() - scoring_started;

        let ranked = ranker::rank(scored);
        let diversified = self.distributor.diversify(ranked, &viewer);

        let offset = (page - 1).saturating_mul(limit);
        let items: Vec<ScoredItem> = diversified.into_iter().skip(offset).take(limit).collect();
        let has_more = total > page.saturating_mul(limit);

        report.record_page(&items, |scored| scored.relevance_score);
        report.total_duration_ms = timer.elapsed_ms();
        report.publish();
        timer.log_if_slow(200);

        let issues = report.detect_issues();
        if !issues.is_empty() {
            debug!(request_id = %report.request_id, ?issues, "feed quality issues");
        }
        debug!(?report, "feed metrics");

        info!(
            total,
            returned = items.len(),
            expired = report.expired_events,
            page,
            "Built feed"
        );

        Ok(FeedResult {
            items,
            page,
            limit,
            total,
            has_more,
        })
    }

    /// Fetch candidates and viewer concurrently; the first failure wins
    async fn fetch(&self, viewer_id: &str) -> Result<(Vec<CandidateItem>, Viewer)> {
        let fetches = async {
            tokio::try_join!(
                self.content.fetch_candidates(viewer_id),
                self.viewers.fetch_viewer(viewer_id),
            )
        };

        tokio::time::timeout(self.fetch_timeout, fetches)
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: self.fetch_timeout.as_millis() as u64,
            })?
    }

    /// Score every candidate in parallel, preserving input order
    async fn score_all(
        &self,
        viewer: Arc<Viewer>,
        candidates: Vec<CandidateItem>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredItem>> {
        let scorer = self.scorer.clone();

        let scored = tokio::task::spawn_blocking(move || {
            use rayon::prelude::*;
            let _scoring_timer = PerformanceTimer::new("parallel_scoring");

            candidates
                .into_par_iter()
                .map(|item| {
                    let components = scorer.score(&viewer, &item, now);
                    ScoredItem::new(item, components)
                })
                .collect::<Vec<_>>()
        })
        .await?;

        Ok(scored)
    }
}

/// An event whose end is strictly before the viewer's local `now`.
/// Items without an end date are never expired.
pub fn is_expired_event(item: &CandidateItem, local_now: NaiveDateTime) -> bool {
    item.content_type == ContentType::Event
        && item.event_end_date.is_some_and(|end| end < local_now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(end: Option<NaiveDateTime>) -> CandidateItem {
        CandidateItem {
            id: "e".to_string(),
            content_type: ContentType::Event,
            event_end_date: end,
            ..Default::default()
        }
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .and_then(|day| day.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_ended_event_is_expired() {
        assert!(is_expired_event(&event(Some(at(16, 12))), at(17, 9)));
    }

    #[test]
    fn test_event_ending_later_or_now_is_kept() {
        assert!(!is_expired_event(&event(Some(at(17, 9))), at(17, 9)));
        assert!(!is_expired_event(&event(Some(at(18, 0))), at(17, 9)));
    }

    #[test]
    fn test_event_without_end_date_is_kept() {
        let mut item = event(None);
        item.event_date = Some(at(1, 10));
        assert!(!is_expired_event(&item, at(17, 9)));
    }

    #[test]
    fn test_only_events_expire() {
        let mut item = event(Some(at(1, 0)));
        item.content_type = ContentType::Producer;
        assert!(!is_expired_event(&item, at(17, 9)));
    }
}
