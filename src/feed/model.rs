//! Feed domain types
//!
//! Request-scoped entities: built from store documents at pipeline entry,
//! read by the scoring and diversification stages, dropped after the response.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::{Index, IndexMut};

/// Kind of content a feed item is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Producer,
    Event,
    User,
    #[default]
    Other,
}

impl ContentType {
    /// Fixed order used for grouping, quota tables and interleaving
    pub const ALL: [ContentType; 4] = [
        ContentType::Producer,
        ContentType::Event,
        ContentType::User,
        ContentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Producer => "producer",
            ContentType::Event => "event",
            ContentType::User => "user",
            ContentType::Other => "other",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per content type
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerType<T> {
    pub producer: T,
    pub event: T,
    pub user: T,
    pub other: T,
}

impl<T> PerType<T> {
    pub fn from_fn(mut f: impl FnMut(ContentType) -> T) -> Self {
        Self {
            producer: f(ContentType::Producer),
            event: f(ContentType::Event),
            user: f(ContentType::User),
            other: f(ContentType::Other),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(ContentType, &T) -> U) -> PerType<U> {
        PerType::from_fn(|t| f(t, &self[t]))
    }

    /// Iterate in `ContentType::ALL` order
    pub fn iter(&self) -> impl Iterator<Item = (ContentType, &T)> {
        ContentType::ALL.into_iter().map(move |t| (t, &self[t]))
    }
}

impl PerType<f64> {
    pub fn sum(&self) -> f64 {
        self.iter().map(|(_, v)| *v).sum()
    }
}

impl PerType<usize> {
    pub fn sum(&self) -> usize {
        self.iter().map(|(_, v)| *v).sum()
    }
}

impl PerType<u64> {
    pub fn sum(&self) -> u64 {
        self.iter().map(|(_, v)| *v).sum()
    }
}

impl<T> Index<ContentType> for PerType<T> {
    type Output = T;

    fn index(&self, t: ContentType) -> &T {
        match t {
            ContentType::Producer => &self.producer,
            ContentType::Event => &self.event,
            ContentType::User => &self.user,
            ContentType::Other => &self.other,
        }
    }
}

impl<T> IndexMut<ContentType> for PerType<T> {
    fn index_mut(&mut self, t: ContentType) -> &mut T {
        match t {
            ContentType::Producer => &mut self.producer,
            ContentType::Event => &mut self.event,
            ContentType::User => &mut self.user,
            ContentType::Other => &mut self.other,
        }
    }
}

/// Anything that can be bucketed by content type
pub trait Typed {
    fn content_type(&self) -> ContentType;
}

/// A point on the globe, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentLocation {
    pub name: String,
}

/// A past like or choice made by the viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PastInteraction {
    pub content_type: ContentType,
    pub item_id: Option<String>,
}

/// The person the feed is ranked for
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Viewer {
    pub id: String,
    pub liked_tags: BTreeSet<String>,
    pub following: HashSet<String>,
    pub trusted_circle: HashSet<String>,
    /// author id -> number of connections shared with that author
    pub mutual_connections: HashMap<String, u32>,
    pub location: Option<GeoPoint>,
    pub frequent_locations: Vec<FrequentLocation>,
    pub engagement_stats: PerType<u64>,
    pub liked_items: Vec<PastInteraction>,
    pub past_choices: Vec<PastInteraction>,
}

/// One opening slot, e.g. `{ day: "samedi", time_range: "18:00 - 23:00" }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub day: Option<String>,
    pub time_range: Option<String>,
}

/// A feed-eligible piece of content
///
/// `content_type` is derived once at ingestion and never changes afterwards.
/// Event dates are wall-clock times in the feed's configured time zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateItem {
    pub id: String,
    pub content_type: ContentType,
    pub title: Option<String>,
    pub content: String,
    pub tags: BTreeSet<String>,
    /// Flat categories, matched exactly against viewer interests
    pub categories: Vec<String>,
    /// Root segments of hierarchical categories ("Théâtre » Comédie" -> "Théâtre")
    pub category_roots: Vec<String>,
    pub author_id: Option<String>,
    pub liked_by: HashSet<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub coordinates: Option<GeoPoint>,
    pub location_name: Option<String>,
    pub schedule: Vec<ScheduleEntry>,
    pub event_date: Option<NaiveDateTime>,
    pub event_end_date: Option<NaiveDateTime>,
}

impl Typed for CandidateItem {
    fn content_type(&self) -> ContentType {
        self.content_type
    }
}

/// Per-item breakdown of the relevance score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub base: f64,
    pub interest: f64,
    pub social: f64,
    pub location: f64,
    pub engagement: f64,
    pub contextual: f64,
    pub total: f64,
}

/// A candidate paired with its score, as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: CandidateItem,
    pub relevance_score: f64,
    pub score_components: ScoreComponents,
}

impl ScoredItem {
    pub fn new(item: CandidateItem, score_components: ScoreComponents) -> Self {
        Self {
            item,
            relevance_score: score_components.total,
            score_components,
        }
    }
}

impl Typed for ScoredItem {
    fn content_type(&self) -> ContentType {
        self.item.content_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_type_indexing_follows_content_type() {
        let mut counts: PerType<usize> = PerType::default();
        counts[ContentType::Event] += 2;
        counts[ContentType::Other] += 1;

        assert_eq!(counts.event, 2);
        assert_eq!(counts.other, 1);
        assert_eq!(counts.sum(), 3);
    }

    #[test]
    fn test_per_type_iterates_in_interleave_order() {
        let order: Vec<ContentType> = PerType::from_fn(|_| ()).iter().map(|(t, _)| t).collect();
        assert_eq!(order, ContentType::ALL.to_vec());
    }

    #[test]
    fn test_scored_item_serializes_flat() {
        let item = CandidateItem {
            id: "p1".to_string(),
            content_type: ContentType::Producer,
            ..Default::default()
        };
        let scored = ScoredItem::new(
            item,
            ScoreComponents {
                total: 12.5,
                ..Default::default()
            },
        );

        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["content_type"], "producer");
        assert_eq!(json["relevance_score"], 12.5);
        assert_eq!(json["score_components"]["total"], 12.5);
    }
}
