//! PostgreSQL-backed feed stores
//!
//! Candidates are JSON documents in `feed_posts`, one logical partition per
//! post source; viewers are JSON documents in `feed_viewers`.
//!
//! ```sql
//! CREATE TABLE feed_posts (
//!     id        TEXT PRIMARY KEY,
//!     partition TEXT NOT NULL,
//!     posted_at TIMESTAMPTZ,
//!     document  JSONB NOT NULL
//! );
//! CREATE INDEX feed_posts_partition_posted ON feed_posts (partition, posted_at DESC);
//!
//! CREATE TABLE feed_viewers (
//!     id       TEXT PRIMARY KEY,
//!     document JSONB NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use futures::future::try_join_all;
use tracing::{debug, instrument, warn};

use super::adapter::DocumentAdapter;
use super::model::{CandidateItem, Viewer};
use super::pipeline::{ContentStore, ViewerStore};
use crate::config::FeedConfig;
use crate::database::{Database, RetryPolicy};
use crate::error::{Error, Result};

/// Content and viewer store over the feed tables
#[derive(Clone)]
pub struct PgFeedStore {
    db: Database,
    partitions: Vec<String>,
    per_partition_limit: i64,
    offset: FixedOffset,
    retry: RetryPolicy,
}

impl PgFeedStore {
    pub fn new(db: Database, config: &FeedConfig) -> Self {
        Self {
            db,
            partitions: config.partitions.clone(),
            per_partition_limit: config.max_candidates_per_partition,
            offset: config.scoring.offset(),
            retry: RetryPolicy::new(config.store_max_retries, config.store_retry_delay),
        }
    }

    fn adapter(&self) -> DocumentAdapter {
        DocumentAdapter::new(self.offset, Utc::now())
    }

    /// Newest documents of one partition
    async fn fetch_partition(&self, partition: &str) -> Result<Vec<serde_json::Value>> {
        let documents = self
            .retry
            .run("feed_posts", move || async move {
                let rows = sqlx::query_scalar::<_, serde_json::Value>(
                    r#"
                    SELECT document
                    FROM feed_posts
                    WHERE partition = $1
                    ORDER BY posted_at DESC NULLS LAST
                    LIMIT $2
                    "#,
                )
                .bind(partition)
                .bind(self.per_partition_limit)
                .fetch_all(self.db.pool())
                .await?;
                Ok::<_, Error>(rows)
            })
            .await?;

        debug!(partition, count = documents.len(), "Fetched partition");
        Ok(documents)
    }
}

#[async_trait]
impl ContentStore for PgFeedStore {
    #[instrument(skip(self))]
    async fn fetch_candidates(&self, viewer_id: &str) -> Result<Vec<CandidateItem>> {
        let batches = try_join_all(
            self.partitions
                .iter()
                .map(|partition| self.fetch_partition(partition)),
        )
        .await?;

        let adapter = self.adapter();
        let mut skipped = 0usize;
        let candidates: Vec<CandidateItem> = batches
            .iter()
            .flatten()
            .filter_map(|doc| {
                let item = adapter.candidate_from_document(doc);
                if item.is_none() {
                    skipped += 1;
                }
                item
            })
            .collect();

        if skipped > 0 {
            warn!(skipped, "Dropped post documents without an id");
        }
        debug!(count = candidates.len(), "Merged candidates from all partitions");

        Ok(candidates)
    }
}

#[async_trait]
impl ViewerStore for PgFeedStore {
    #[instrument(skip(self))]
    async fn fetch_viewer(&self, viewer_id: &str) -> Result<Viewer> {
        let document = self
            .retry
            .run("feed_viewers", move || async move {
                let row = sqlx::query_scalar::<_, serde_json::Value>(
                    "SELECT document FROM feed_viewers WHERE id = $1",
                )
                .bind(viewer_id)
                .fetch_optional(self.db.pool())
                .await?;
                Ok::<_, Error>(row)
            })
            .await?;

        match document {
            Some(doc) => Ok(self.adapter().viewer_from_document(viewer_id, &doc)),
            None => Err(Error::not_found("viewer", viewer_id)),
        }
    }
}
