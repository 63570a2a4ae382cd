//! Choice feed library crate
//!
//! Ranking and diversification of social feeds, plus the storage, HTTP and
//! configuration layers around it. Re-exports core types for integration tests
//! and external use.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod feed;

// Re-export commonly used types
pub use config::{Config, FeedConfig};
pub use database::Database;
pub use error::{Error, Result};
pub use feed::{
    CandidateItem, ContentStore, ContentType, FeedPipeline, FeedResult, ScoredItem, Viewer,
    ViewerStore,
};
