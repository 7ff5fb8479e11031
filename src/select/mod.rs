//! Candidate Selection
//!
//! Narrows the catalog to the models trained on datasets most similar to the
//! query's dataset.

pub mod resolver;
pub mod similarity;

pub use resolver::{Resolution, SimilarityLevel, SimilarityResolver, TierTasks};
