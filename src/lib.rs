//! AssistML Model Recommender
//!
//! Recommends trained ML models for a new dataset and task:
//! - Similarity-tiered candidate selection over a model catalog
//! - Density-based acceptability clustering against metric preferences
//! - Configuration, dataset and implementation level ranking
//! - Distrust scoring of every approximation made on the way

pub mod catalog;
pub mod cluster;
pub mod config;
pub mod error;
pub mod query;
pub mod ranking;
pub mod select;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use config::RecommenderConfig;
pub use error::{RecommenderError, Result};
pub use query::{Preferences, Query, QueryRequest};
pub use ranking::RecommendationReport;
pub use service::ModelRecommender;
pub use store::{CatalogSnapshot, DocumentStore, InMemoryStore, SqliteStore};
