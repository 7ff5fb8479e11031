//! Implementation groups
//!
//! Collects every candidate model of one implementation, split into one
//! `ImplementationDatasetGroup` per training dataset. Dataset groups are
//! created lazily and exactly once per dataset even when models arrive
//! concurrently.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::document_cache::DocumentCache;
use super::hyperparameter_analytics::HyperparameterAnalytics;
use super::implementation_dataset_group::{DatasetGroupReport, ImplementationDatasetGroup};
use super::lock_table::LockTable;
use super::metric_analytics::{uniform_weights, AggregatedMetrics, MetricAnalytics};
use crate::catalog::{CandidateModel, Dataset, DocumentId, Implementation, Metric};
use crate::config::RankingSettings;
use crate::error::{RecommenderError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationGroupReport {
    pub implementation_id: DocumentId,
    pub implementation: String,
    pub dependencies: usize,
    pub overall_score: f64,
    pub aggregated_metrics: AggregatedMetrics,
    pub dataset_groups: Vec<DatasetGroupReport>,
}

type SharedDatasetGroup = Arc<Mutex<ImplementationDatasetGroup>>;

struct RankedDataset {
    similarity: f64,
    group: SharedDatasetGroup,
}

struct OverallScore {
    score: f64,
    aggregated_metrics: AggregatedMetrics,
}

pub struct ImplementationGroup {
    implementation: Arc<Implementation>,
    cache: Arc<DocumentCache>,
    metric_analytics: Arc<RwLock<MetricAnalytics>>,
    hyperparameter_analytics: Arc<RwLock<HyperparameterAnalytics>>,
    settings: RankingSettings,
    dataset_groups: RwLock<HashMap<DocumentId, SharedDatasetGroup>>,
    group_locks: LockTable<DocumentId>,
    ranked: RwLock<Vec<RankedDataset>>,
    overall: RwLock<Option<OverallScore>>,
}

impl ImplementationGroup {
    /// Resolve the implementation through the cache and open an empty group.
    pub async fn create(
        implementation_id: &DocumentId,
        cache: Arc<DocumentCache>,
        metric_analytics: Arc<RwLock<MetricAnalytics>>,
        settings: RankingSettings,
    ) -> Result<Self> {
        let implementation = cache.implementation(implementation_id).await?;
        let hyperparameter_analytics = Arc::new(RwLock::new(HyperparameterAnalytics::new(
            Arc::clone(&implementation),
            settings.hyperparameter_resolution,
        )));
        debug!(implementation = %implementation.id, title = %implementation.title, "Created implementation group");
        Ok(Self {
            implementation,
            cache,
            metric_analytics,
            hyperparameter_analytics,
            settings,
            dataset_groups: RwLock::new(HashMap::new()),
            group_locks: LockTable::new(),
            ranked: RwLock::new(Vec::new()),
            overall: RwLock::new(None),
        })
    }

    pub fn implementation(&self) -> &Arc<Implementation> {
        &self.implementation
    }

    pub async fn add_model(&self, model: CandidateModel) -> Result<()> {
        let dataset = self.cache.dataset(model.dataset_id()).await?;
        let group = self.dataset_group(dataset).await;
        let mut group = group.lock().await;
        group.add_model(model).await
    }

    async fn dataset_group(&self, dataset: Arc<Dataset>) -> SharedDatasetGroup {
        if let Some(group) = self.dataset_groups.read().await.get(&dataset.id) {
            return Arc::clone(group);
        }

        let lock = self.group_locks.lock_for(&dataset.id).await;
        let _guard = lock.lock().await;
        if let Some(group) = self.dataset_groups.read().await.get(&dataset.id) {
            return Arc::clone(group);
        }

        debug!(implementation = %self.implementation.id, dataset = %dataset.id, "Opening dataset group");
        let id = dataset.id.clone();
        let group = Arc::new(Mutex::new(ImplementationDatasetGroup::new(
            Arc::clone(&self.implementation),
            dataset,
            Arc::clone(&self.metric_analytics),
            Arc::clone(&self.hyperparameter_analytics),
            self.settings.clone(),
        )));
        self.dataset_groups.write().await.insert(id, Arc::clone(&group));
        group
    }

    pub async fn dataset_group_count(&self) -> usize {
        self.dataset_groups.read().await.len()
    }

    /// Rank configurations inside every dataset group, then order the groups
    /// by similarity of their dataset to `target` (ties by dataset id).
    ///
    /// Metric normalizers must already be fitted. Standardizers are fitted
    /// here, which closes the group to further models.
    pub async fn rank_datasets(&self, target: &Dataset, selected_metrics: &[Metric]) -> Result<()> {
        {
            let mut analytics = self.hyperparameter_analytics.write().await;
            if !analytics.are_standardizers_fitted() {
                analytics.fit_standardizers();
            }
        }

        let groups: Vec<SharedDatasetGroup> = self.dataset_groups.read().await.values().cloned().collect();
        let mut keyed = Vec::with_capacity(groups.len());
        for group in groups {
            let (similarity, id) = {
                let mut guard = group.lock().await;
                guard.rank_configurations(selected_metrics).await?;
                (guard.dataset_similarity(target), guard.dataset().id.clone())
            };
            keyed.push((similarity, id, group));
        }
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        *self.ranked.write().await = keyed
            .into_iter()
            .map(|(similarity, _, group)| RankedDataset { similarity, group })
            .collect();
        Ok(())
    }

    /// Score the implementation from the best configurations of its `top_n`
    /// most similar dataset groups.
    pub async fn calculate_overall_score(&self, selected_metrics: &[Metric], top_n: usize) -> Result<f64> {
        let ranked = self.ranked.read().await;
        if ranked.is_empty() {
            return Err(RecommenderError::ordering(format!(
                "datasets of '{}' have not been ranked",
                self.implementation.title
            )));
        }

        let mut best = Vec::with_capacity(top_n.min(ranked.len()));
        for entry in ranked.iter().take(top_n) {
            let group = entry.group.lock().await;
            best.push((entry.similarity, group.metrics_of_best_configuration()?.clone()));
        }
        drop(ranked);

        let weights = uniform_weights(selected_metrics);
        let analytics = self.metric_analytics.read().await;
        let parts: Vec<(f64, &AggregatedMetrics)> = best.iter().map(|(w, m)| (*w, m)).collect();
        let aggregated_metrics = analytics.aggregate_weighted(&parts);
        let score = analytics
            .calculate_overall_score(&aggregated_metrics, &weights)
            .penalized(self.settings.lambda_penalty);
        drop(analytics);

        info!(
            implementation = %self.implementation.title,
            datasets = best.len(),
            score,
            "Scored implementation group"
        );
        *self.overall.write().await = Some(OverallScore {
            score,
            aggregated_metrics,
        });
        Ok(score)
    }

    pub async fn overall_score(&self) -> Option<f64> {
        self.overall.read().await.as_ref().map(|o| o.score)
    }

    pub async fn generate_report(&self, target: &Dataset, top_n: usize) -> Result<ImplementationGroupReport> {
        let overall = self.overall.read().await;
        let overall = overall.as_ref().ok_or_else(|| {
            RecommenderError::ordering(format!("'{}' has no overall score yet", self.implementation.title))
        })?;

        let ranked = self.ranked.read().await;
        let mut dataset_groups = Vec::with_capacity(top_n.min(ranked.len()));
        for entry in ranked.iter().take(top_n) {
            dataset_groups.push(entry.group.lock().await.report(target, top_n)?);
        }

        Ok(ImplementationGroupReport {
            implementation_id: self.implementation.id.clone(),
            implementation: self.implementation.title.clone(),
            dependencies: self.implementation.dependencies.len(),
            overall_score: overall.score,
            aggregated_metrics: overall.aggregated_metrics.clone(),
            dataset_groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use crate::catalog::{
        DatasetInfo, Features, Metrics, Model, Parameter, ParameterValue, Setup, TargetFeatureType, Task, TaskType,
    };
    use crate::store::{InMemoryStore, RetryPolicy};

    fn dataset(id: &str, numeric_ratio: f64) -> Dataset {
        Dataset {
            id: DocumentId::new(id),
            info: DatasetInfo {
                dataset_name: id.to_string(),
                target_label: "y".into(),
                target_feature_type: TargetFeatureType::Binary,
                observations: 100,
                analyzed_observations: 100,
                features: 4,
                numeric_ratio,
                categorical_ratio: 1.0 - numeric_ratio,
                datetime_ratio: 0.0,
                unstructured_ratio: 0.0,
                analyzed_features: Vec::new(),
                discarded_features: Vec::new(),
                analysis_time: 0.0,
            },
            features: Features::default(),
        }
    }

    fn candidate(id: &str, dataset_id: &str, depth: i64, accuracy: f64) -> CandidateModel {
        let task = Arc::new(Task {
            id: DocumentId::new(format!("t-{}", dataset_id)),
            task_type: TaskType::BinaryClassification,
            dataset_id: DocumentId::new(dataset_id),
            target_name: None,
            related_implementations: Vec::new(),
        });
        CandidateModel::new(
            Arc::new(Model {
                id: DocumentId::new(id),
                setup: Setup {
                    hyper_parameters: vec![Parameter::new("depth", ParameterValue::Integer(depth))],
                    setup_string: None,
                    implementation_id: DocumentId::new("tree"),
                    task_id: task.id.clone(),
                },
                metrics: Metrics::new().with(Metric::Accuracy, accuracy),
            }),
            task,
        )
    }

    async fn group() -> (ImplementationGroup, Arc<RwLock<MetricAnalytics>>) {
        let mut store = InMemoryStore::new();
        store.insert_dataset(dataset("near", 0.5));
        store.insert_dataset(dataset("far", 0.9));
        store.insert_implementation(Implementation {
            id: DocumentId::new("tree"),
            title: "decision tree".into(),
            dependencies: Vec::new(),
            parameters: BTreeMap::new(),
            description: None,
        });
        let cache = Arc::new(DocumentCache::new(Arc::new(store), RetryPolicy::none()));
        let metrics = Arc::new(RwLock::new(MetricAnalytics::new()));
        let group = ImplementationGroup::create(
            &DocumentId::new("tree"),
            cache,
            metrics.clone(),
            RankingSettings::default(),
        )
        .await
        .unwrap();
        (group, metrics)
    }

    #[tokio::test]
    async fn test_concurrent_adds_create_one_dataset_group() {
        let (group, _) = group().await;
        let adds = (0..12).map(|i| group.add_model(candidate(&format!("m{}", i), "near", i, 0.8)));
        futures::future::try_join_all(adds).await.unwrap();
        assert_eq!(group.dataset_group_count().await, 1);
    }

    #[tokio::test]
    async fn test_rank_datasets_orders_by_similarity() {
        let (group, metrics) = group().await;
        group.add_model(candidate("m1", "far", 3, 0.99)).await.unwrap();
        group.add_model(candidate("m2", "near", 3, 0.70)).await.unwrap();
        group.add_model(candidate("m3", "near", 9, 0.75)).await.unwrap();
        assert_eq!(group.dataset_group_count().await, 2);
        metrics.write().await.fit_normalizers().unwrap();

        let target = dataset("query", 0.5);
        group.rank_datasets(&target, &[Metric::Accuracy]).await.unwrap();
        let score = group.calculate_overall_score(&[Metric::Accuracy], 1).await.unwrap();
        assert_eq!(group.overall_score().await, Some(score));

        let report = group.generate_report(&target, 2).await.unwrap();
        assert_eq!(report.implementation, "decision tree");
        let order: Vec<&str> = report.dataset_groups.iter().map(|g| g.dataset_id.as_str()).collect();
        assert_eq!(order, vec!["near", "far"]);
        assert!((report.dataset_groups[0].dataset_similarity - 1.0).abs() < 1e-9);
        assert_eq!(report.dataset_groups[0].model_count, 2);
    }

    #[tokio::test]
    async fn test_score_before_ranking_is_ordering_error() {
        let (group, _) = group().await;
        let err = group.calculate_overall_score(&[Metric::Accuracy], 3).await.unwrap_err();
        assert!(matches!(err, RecommenderError::Ordering(_)));
        assert!(group.generate_report(&dataset("q", 0.5), 3).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_implementation_fails_creation() {
        let cache = Arc::new(DocumentCache::new(Arc::new(InMemoryStore::new()), RetryPolicy::none()));
        let result = ImplementationGroup::create(
            &DocumentId::new("ghost"),
            cache,
            Arc::new(RwLock::new(MetricAnalytics::new())),
            RankingSettings::default(),
        )
        .await;
        assert!(matches!(result, Err(RecommenderError::NotFound { .. })));
    }
}
