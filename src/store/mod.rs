//! Document Store Interface and Implementations
//!
//! The catalog lives in an external document store. The pipeline only needs
//! the handful of query shapes below; everything else about the store is a
//! backend concern.

pub mod memory;
pub mod retry;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use retry::RetryPolicy;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::{Dataset, Document, DocumentId, DocumentKind, Implementation, Model, Task, TaskType};
use crate::error::{StoreError, StoreResult};

/// One batch of models, in ascending id order
#[derive(Debug, Clone, Default)]
pub struct ModelPage {
    pub models: Vec<Model>,
    /// Id of the last model returned when more rows may follow.
    pub next_cursor: Option<DocumentId>,
}

impl ModelPage {
    /// Builds a page from rows already sorted by id and truncated to `batch_size`.
    pub fn from_rows(models: Vec<Model>, batch_size: usize) -> Self {
        let next_cursor = if models.len() == batch_size {
            models.last().map(|m| m.id.clone())
        } else {
            None
        };
        Self { models, next_cursor }
    }
}

/// Query capability the recommender consumes
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All tasks of the given type.
    async fn find_tasks_by_type(&self, task_type: TaskType) -> StoreResult<Vec<Task>>;

    /// Datasets whose zero/nonzero data-type ratio pattern equals the
    /// target's. With a tolerance, every nonzero ratio must additionally lie
    /// within that absolute distance of the target's ratio.
    async fn find_datasets_matching_ratio_pattern(
        &self,
        target: &Dataset,
        tolerance: Option<f64>,
    ) -> StoreResult<Vec<Dataset>>;

    /// Models trained on any of `task_ids` with an id strictly greater than
    /// `cursor`, ascending by id, at most `batch_size` of them.
    async fn find_models_for_tasks(
        &self,
        task_ids: &[DocumentId],
        batch_size: usize,
        cursor: Option<&DocumentId>,
    ) -> StoreResult<ModelPage>;

    /// Fetch one document by identity. Idempotent and side-effect free.
    async fn resolve_document(&self, kind: DocumentKind, id: &DocumentId) -> StoreResult<Document>;
}

/// A serialized catalog, as exported by ingestion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub implementations: Vec<Implementation>,
    #[serde(default)]
    pub models: Vec<Model>,
}

impl CatalogSnapshot {
    pub fn from_json_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| StoreError::Backend(format!("cannot read {:?}: {}", path.as_ref(), e)))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
