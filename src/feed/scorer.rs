//! Item Scorer
//!
//! Scores one candidate against one viewer. Six independent sub-scores are
//! computed in raw points (no normalization) and blended into `total`:
//!
//! ```text
//! total = base + 0.3 interest + 0.25 social + 0.2 location
//!              + 0.15 engagement + 0.1 contextual
//! ```
//!
//! Absent or unparsable fields contribute zero; scoring never fails.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::matching::{contains_ignore_case, fuzzy_match};
use super::model::{CandidateItem, ScoreComponents, Viewer};
use super::temporal::{self, DayPart};

// Point values for each signal
const TAG_MATCH_POINTS: f64 = 10.0;
const TRUSTED_AUTHOR_POINTS: f64 = 25.0;
const INTEREST_TAG_POINTS: f64 = 15.0;
const INTEREST_CONTENT_POINTS: f64 = 5.0;
const CATEGORY_POINTS: f64 = 10.0;
const CATEGORY_ROOT_POINTS: f64 = 10.0;
const FOLLOWED_AUTHOR_POINTS: f64 = 30.0;
const FOLLOWED_LIKE_POINTS: f64 = 15.0;
const MUTUAL_CONNECTION_POINTS: f64 = 5.0;
const PROXIMITY_MAX_POINTS: f64 = 100.0;
const FREQUENT_LOCATION_POINTS: f64 = 25.0;
const TYPE_AFFINITY_POINTS: f64 = 5.0;
const TYPE_AFFINITY_CAP: f64 = 40.0;
const UPCOMING_EVENT_WINDOW_DAYS: i64 = 7;
const UPCOMING_EVENT_POINTS: f64 = 30.0;
const UPCOMING_EVENT_DAILY_DECAY: f64 = 3.0;
const DAY_PART_POINTS: f64 = 15.0;
const WEEKEND_POINTS: f64 = 20.0;
const WEEKDAY_POINTS: f64 = 15.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Blend weights applied to the sub-scores (base is always added as-is)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub interest: f64,
    pub social: f64,
    pub location: f64,
    pub engagement: f64,
    pub contextual: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            interest: 0.3,
            social: 0.25,
            location: 0.2,
            engagement: 0.15,
            contextual: 0.1,
        }
    }
}

/// Scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    /// Rate of the `e^(-rate * km)` proximity decay
    pub distance_decay_per_km: f64,
    /// Posts younger than this many hours earn a recency bonus
    pub recency_window_hours: f64,
    /// Offset of the viewer's wall clock from UTC, in minutes
    pub utc_offset_minutes: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            distance_decay_per_km: 0.1,
            recency_window_hours: 20.0,
            utc_offset_minutes: 0,
        }
    }
}

impl ScoringConfig {
    /// Viewer wall-clock offset; out-of-range values fall back to UTC
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Relevance scorer for feed candidates
#[derive(Debug, Clone, Default)]
pub struct ItemScorer {
    config: ScoringConfig,
}

impl ItemScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score `item` for `viewer` as of `now`
    pub fn score(&self, viewer: &Viewer, item: &CandidateItem, now: DateTime<Utc>) -> ScoreComponents {
        let base = self.base_score(viewer, item, now);
        let interest = Self::interest_score(viewer, item);
        let social = Self::social_score(viewer, item);
        let location = self.location_score(viewer, item);
        let engagement = self.engagement_score(viewer, item, now);
        let contextual = self.contextual_score(item, now);

        let w = &self.config.weights;
        let total = base
            + w.interest * interest
            + w.social * social
            + w.location * location
            + w.engagement * engagement
            + w.contextual * contextual;

        trace!(item_id = %item.id, base, interest, social, location, engagement, contextual, total, "scored item");

        ScoreComponents {
            base,
            interest,
            social,
            location,
            engagement,
            contextual,
            total,
        }
    }

    // ---- Sub-scores ----

    /// Liked tags, trusted author, and freshness
    fn base_score(&self, viewer: &Viewer, item: &CandidateItem, now: DateTime<Utc>) -> f64 {
        let mut score = TAG_MATCH_POINTS * matching_tags(viewer, item) as f64;

        if is_member(&item.author_id, |id| viewer.trusted_circle.contains(id)) {
            score += TRUSTED_AUTHOR_POINTS;
        }

        if let Some(posted_at) = item.posted_at {
            let hours_since = (now - posted_at).num_milliseconds() as f64 / 3_600_000.0;
            score += (self.config.recency_window_hours - hours_since).max(0.0);
        }

        score
    }

    /// Tags, text mentions, and categories matching the viewer's interests
    fn interest_score(viewer: &Viewer, item: &CandidateItem) -> f64 {
        let mut score = INTEREST_TAG_POINTS * matching_tags(viewer, item) as f64;

        let mentioned = viewer
            .liked_tags
            .iter()
            .filter(|interest| contains_ignore_case(&item.content, interest))
            .count();
        score += INTEREST_CONTENT_POINTS * mentioned as f64;

        let category_hits = item
            .categories
            .iter()
            .filter(|c| viewer.liked_tags.contains(c.as_str()))
            .count();
        score += CATEGORY_POINTS * category_hits as f64;

        let root_hits = item
            .category_roots
            .iter()
            .filter(|root| viewer.liked_tags.iter().any(|interest| fuzzy_match(root, interest)))
            .count();
        score += CATEGORY_ROOT_POINTS * root_hits as f64;

        score
    }

    /// Follow graph signals
    fn social_score(viewer: &Viewer, item: &CandidateItem) -> f64 {
        let mut score = 0.0;

        if is_member(&item.author_id, |id| viewer.following.contains(id)) {
            score += FOLLOWED_AUTHOR_POINTS;
        }

        let followed_likes = item
            .liked_by
            .iter()
            .filter(|id| viewer.following.contains(*id))
            .count();
        score += FOLLOWED_LIKE_POINTS * followed_likes as f64;

        if let Some(mutual) = item
            .author_id
            .as_ref()
            .and_then(|id| viewer.mutual_connections.get(id))
        {
            score += MUTUAL_CONNECTION_POINTS * f64::from(*mutual);
        }

        score
    }

    /// Proximity decay plus a bonus for the viewer's usual places
    fn location_score(&self, viewer: &Viewer, item: &CandidateItem) -> f64 {
        let mut score = 0.0;

        if let (Some(here), Some(there)) = (viewer.location, item.coordinates) {
            let distance = here.distance_km(&there);
            if distance.is_finite() {
                score += PROXIMITY_MAX_POINTS
                    * super::geo::proximity_decay(distance, self.config.distance_decay_per_km);
            }
        }

        if let Some(name) = item.location_name.as_deref() {
            if viewer
                .frequent_locations
                .iter()
                .any(|loc| fuzzy_match(&loc.name, name))
            {
                score += FREQUENT_LOCATION_POINTS;
            }
        }

        score
    }

    /// Affinity for this content type plus a boost for events happening soon
    fn engagement_score(&self, viewer: &Viewer, item: &CandidateItem, now: DateTime<Utc>) -> f64 {
        let same_type = viewer
            .liked_items
            .iter()
            .chain(viewer.past_choices.iter())
            .filter(|past| past.content_type == item.content_type)
            .count();
        let mut score = (TYPE_AFFINITY_POINTS * same_type as f64).min(TYPE_AFFINITY_CAP);

        if let Some(event_date) = item.event_date {
            let local_now = temporal::local_time(now, self.config.offset());
            let seconds = (event_date - local_now).num_seconds() as f64;
            let days_until = (seconds / SECONDS_PER_DAY).ceil() as i64;
            if days_until > 0 && days_until <= UPCOMING_EVENT_WINDOW_DAYS {
                score += UPCOMING_EVENT_POINTS - UPCOMING_EVENT_DAILY_DECAY * days_until as f64;
            }
        }

        score
    }

    /// Fit between the item's time context and the viewer's current clock
    fn contextual_score(&self, item: &CandidateItem, now: DateTime<Utc>) -> f64 {
        let (hour, weekend) = temporal::local_clock(now, self.config.offset());
        let mut score = 0.0;

        if let (Some(context), Some(part)) = (temporal::time_context(item), DayPart::from_hour(hour)) {
            if context.has(part) {
                score += DAY_PART_POINTS;
            }
        }

        if weekend && temporal::is_weekend_oriented(item) {
            score += WEEKEND_POINTS;
        } else if !weekend && temporal::is_weekday_oriented(item) {
            score += WEEKDAY_POINTS;
        }

        score
    }
}

fn matching_tags(viewer: &Viewer, item: &CandidateItem) -> usize {
    item.tags.intersection(&viewer.liked_tags).count()
}

fn is_member(id: &Option<String>, contains: impl Fn(&String) -> bool) -> bool {
    id.as_ref().is_some_and(contains)
}
