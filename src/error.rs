//! Error types
//!
//! `RecommenderError` is what the pipeline surfaces to callers; `StoreError`
//! is what a `DocumentStore` backend reports and the retry policy inspects.

use thiserror::Error;

use crate::catalog::{DocumentKind, TaskType};

pub type Result<T> = std::result::Result<T, RecommenderError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by a document store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Timeouts, dropped connections, busy databases. Safe to retry.
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("{kind} '{id}' not found in store")]
    NotFound { kind: DocumentKind, id: String },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("document (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Transient(e.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Backend(format!("blocking store task failed: {}", e))
    }
}

/// Errors surfaced by the recommendation pipeline
#[derive(Debug, Error)]
pub enum RecommenderError {
    /// The query's dataset (or another referenced document) is absent.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: DocumentKind, id: String },

    /// The catalog holds no trained model for the requested task type.
    #[error("no model for task type '{0}' found in catalog")]
    TaskTypeNotFound(TaskType),

    /// Malformed input, rejected before any work begins.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A contract violation between pipeline stages (a defect, never retried).
    #[error("operation out of order: {0}")]
    Ordering(String),

    #[error("store operation '{operation}' failed after {attempts} attempt(s): {source}")]
    StoreExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(StoreError),

    /// Tier 0 produced no candidates; no recommendation is possible.
    #[error("no candidate models exist for task type '{task_type}'")]
    EmptyResult { task_type: TaskType },
}

impl RecommenderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RecommenderError::Validation(msg.into())
    }

    pub fn ordering(msg: impl Into<String>) -> Self {
        RecommenderError::Ordering(msg.into())
    }

    /// True for the non-exceptional "nothing to recommend" outcome.
    pub fn is_no_recommendation(&self) -> bool {
        matches!(self, RecommenderError::EmptyResult { .. })
    }
}

impl From<StoreError> for RecommenderError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, id } => RecommenderError::NotFound { kind, id },
            other => RecommenderError::Store(other),
        }
    }
}
