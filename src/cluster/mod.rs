//! Acceptability Clustering
//!
//! Splits candidate models into acceptable and nearly acceptable groups
//! relative to the query's performance preferences.

pub mod acceptability;
pub mod dbscan;

pub use acceptability::{Acceptability, AcceptabilityClassifier, AcceptabilityDistrust, ClusterFit};
pub use dbscan::Dbscan;
