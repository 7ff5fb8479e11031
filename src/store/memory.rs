//! In-memory document store
//!
//! Backs tests and JSON catalog exports. Ratio matching reuses the same
//! predicates the resolver applies, so both backends agree on tiers.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{CatalogSnapshot, DocumentStore, ModelPage};
use crate::catalog::{Dataset, Document, DocumentId, DocumentKind, Implementation, Model, Task, TaskType};
use crate::error::{StoreError, StoreResult};
use crate::select::similarity;

#[derive(Default)]
pub struct InMemoryStore {
    datasets: BTreeMap<DocumentId, Arc<Dataset>>,
    tasks: BTreeMap<DocumentId, Arc<Task>>,
    implementations: BTreeMap<DocumentId, Arc<Implementation>>,
    models: BTreeMap<DocumentId, Arc<Model>>,
    resolve_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut store = Self::new();
        for dataset in snapshot.datasets {
            store.insert_dataset(dataset);
        }
        for task in snapshot.tasks {
            store.insert_task(task);
        }
        for implementation in snapshot.implementations {
            store.insert_implementation(implementation);
        }
        for model in snapshot.models {
            store.insert_model(model);
        }
        store
    }

    pub fn insert_dataset(&mut self, dataset: Dataset) {
        self.datasets.insert(dataset.id.clone(), Arc::new(dataset));
    }

    pub fn insert_task(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), Arc::new(task));
    }

    pub fn insert_implementation(&mut self, implementation: Implementation) {
        self.implementations.insert(implementation.id.clone(), Arc::new(implementation));
    }

    pub fn insert_model(&mut self, model: Model) {
        self.models.insert(model.id.clone(), Arc::new(model));
    }

    /// Number of `resolve_document` calls served so far.
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_tasks_by_type(&self, task_type: TaskType) -> StoreResult<Vec<Task>> {
        Ok(self
            .tasks
            .values()
            .filter(|t| t.task_type == task_type)
            .map(|t| t.as_ref().clone())
            .collect())
    }

    async fn find_datasets_matching_ratio_pattern(
        &self,
        target: &Dataset,
        tolerance: Option<f64>,
    ) -> StoreResult<Vec<Dataset>> {
        Ok(self
            .datasets
            .values()
            .filter(|d| similarity::matches_ratios(&target.info, &d.info, tolerance))
            .map(|d| d.as_ref().clone())
            .collect())
    }

    async fn find_models_for_tasks(
        &self,
        task_ids: &[DocumentId],
        batch_size: usize,
        cursor: Option<&DocumentId>,
    ) -> StoreResult<ModelPage> {
        if batch_size == 0 {
            return Err(StoreError::Backend("batch size must be positive".into()));
        }
        let wanted: HashSet<&DocumentId> = task_ids.iter().collect();
        let lower = match cursor {
            Some(c) => Bound::Excluded(c.clone()),
            None => Bound::Unbounded,
        };
        let models: Vec<Model> = self
            .models
            .range((lower, Bound::Unbounded))
            .map(|(_, m)| m)
            .filter(|m| wanted.contains(&m.setup.task_id))
            .take(batch_size)
            .map(|m| m.as_ref().clone())
            .collect();
        Ok(ModelPage::from_rows(models, batch_size))
    }

    async fn resolve_document(&self, kind: DocumentKind, id: &DocumentId) -> StoreResult<Document> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let found = match kind {
            DocumentKind::Dataset => self.datasets.get(id).cloned().map(Document::Dataset),
            DocumentKind::Task => self.tasks.get(id).cloned().map(Document::Task),
            DocumentKind::Implementation => self.implementations.get(id).cloned().map(Document::Implementation),
            DocumentKind::Model => self.models.get(id).cloned().map(Document::Model),
        };
        found.ok_or_else(|| StoreError::NotFound { kind, id: id.to_string() })
    }
}
