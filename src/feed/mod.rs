//! Feed ranking and diversification
//!
//! Turns a viewer profile and a pool of heterogeneous candidates (user posts,
//! producer posts, event posts) into a relevance-ordered, type-balanced page.
//!
//! # Stages
//!
//! - **Scoring** (`scorer`): six sub-scores per item, blended into a total
//! - **Ranking** (`ranker`): stable sort by total, descending
//! - **Diversification** (`diversity`): quota-based interleaving by content type
//! - **Pipeline** (`pipeline`): fetch, filter ended events, run the stages, paginate
//!
//! Store documents enter through `adapter`; `store` provides the PostgreSQL
//! implementation of the store traits.

pub mod adapter;
pub mod diversity;
pub mod geo;
pub mod matching;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod ranker;
pub mod scorer;
pub mod store;
pub mod temporal;

pub use adapter::DocumentAdapter;
pub use diversity::{DistributionConfig, DistributionPlan, DiversityDistributor};
pub use geo::distance_km;
pub use model::{
    CandidateItem, ContentType, FrequentLocation, GeoPoint, PastInteraction, PerType,
    ScheduleEntry, ScoreComponents, ScoredItem, Typed, Viewer,
};
pub use pipeline::{ContentStore, FeedPipeline, FeedResult, ViewerStore};
pub use ranker::rank;
pub use scorer::{ItemScorer, ScoringConfig, ScoringWeights};
pub use store::PgFeedStore;
