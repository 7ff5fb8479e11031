//! Document cache
//!
//! Memoizes datasets and implementations by id for the lifetime of one
//! report. Many models point at the same few documents, so a miss goes to the
//! store once per id even when callers race on it.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::lock_table::LockTable;
use crate::catalog::{Dataset, Document, DocumentId, DocumentKind, Implementation};
use crate::error::{RecommenderError, Result};
use crate::store::{DocumentStore, RetryPolicy};

pub struct DocumentCache {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
    datasets: RwLock<HashMap<DocumentId, Arc<Dataset>>>,
    implementations: RwLock<HashMap<DocumentId, Arc<Implementation>>>,
    fetch_locks: LockTable<(DocumentKind, DocumentId)>,
}

impl DocumentCache {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            datasets: RwLock::new(HashMap::new()),
            implementations: RwLock::new(HashMap::new()),
            fetch_locks: LockTable::new(),
        }
    }

    pub async fn dataset(&self, id: &DocumentId) -> Result<Arc<Dataset>> {
        if let Some(hit) = self.datasets.read().await.get(id) {
            return Ok(Arc::clone(hit));
        }

        let lock = self.fetch_locks.lock_for(&(DocumentKind::Dataset, id.clone())).await;
        let _guard = lock.lock().await;
        if let Some(hit) = self.datasets.read().await.get(id) {
            return Ok(Arc::clone(hit));
        }

        let dataset = match self.fetch(DocumentKind::Dataset, id).await? {
            Document::Dataset(d) => d,
            other => return Err(unexpected(DocumentKind::Dataset, &other)),
        };
        self.datasets.write().await.insert(id.clone(), Arc::clone(&dataset));
        Ok(dataset)
    }

    pub async fn implementation(&self, id: &DocumentId) -> Result<Arc<Implementation>> {
        if let Some(hit) = self.implementations.read().await.get(id) {
            return Ok(Arc::clone(hit));
        }

        let lock = self.fetch_locks.lock_for(&(DocumentKind::Implementation, id.clone())).await;
        let _guard = lock.lock().await;
        if let Some(hit) = self.implementations.read().await.get(id) {
            return Ok(Arc::clone(hit));
        }

        let implementation = match self.fetch(DocumentKind::Implementation, id).await? {
            Document::Implementation(i) => i,
            other => return Err(unexpected(DocumentKind::Implementation, &other)),
        };
        self.implementations.write().await.insert(id.clone(), Arc::clone(&implementation));
        Ok(implementation)
    }

    async fn fetch(&self, kind: DocumentKind, id: &DocumentId) -> Result<Document> {
        debug!(%kind, %id, "Document cache miss");
        let store = &self.store;
        self.retry.run("resolve_document", || store.resolve_document(kind, id)).await
    }

    pub async fn len(&self) -> usize {
        self.datasets.read().await.len() + self.implementations.read().await.len()
    }
}

fn unexpected(wanted: DocumentKind, got: &Document) -> RecommenderError {
    RecommenderError::Store(crate::error::StoreError::Backend(format!(
        "store returned a {} where a {} was requested",
        got.kind(),
        wanted
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DatasetInfo, Features, TargetFeatureType};
    use crate::store::InMemoryStore;

    fn dataset(id: &str) -> Dataset {
        Dataset {
            id: DocumentId::new(id),
            info: DatasetInfo {
                dataset_name: id.to_string(),
                target_label: "y".into(),
                target_feature_type: TargetFeatureType::Binary,
                observations: 10,
                analyzed_observations: 10,
                features: 1,
                numeric_ratio: 1.0,
                categorical_ratio: 0.0,
                datetime_ratio: 0.0,
                unstructured_ratio: 0.0,
                analyzed_features: Vec::new(),
                discarded_features: Vec::new(),
                analysis_time: 0.0,
            },
            features: Features::default(),
        }
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let mut store = InMemoryStore::new();
        store.insert_dataset(dataset("d1"));
        let store = Arc::new(store);
        let cache = Arc::new(DocumentCache::new(store.clone(), RetryPolicy::none()));

        let id = DocumentId::new("d1");
        let lookups = (0..16).map(|_| {
            let cache = cache.clone();
            let id = id.clone();
            async move { cache.dataset(&id).await }
        });
        let results = futures::future::join_all(lookups).await;

        assert!(results.iter().all(|r| r.as_ref().map(|d| d.id.as_str() == "d1").unwrap_or(false)));
        assert_eq!(store.resolve_calls(), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let cache = DocumentCache::new(Arc::new(InMemoryStore::new()), RetryPolicy::none());
        let err = cache.implementation(&DocumentId::new("ghost")).await.unwrap_err();
        assert!(matches!(err, RecommenderError::NotFound { kind: DocumentKind::Implementation, .. }));
    }
}
