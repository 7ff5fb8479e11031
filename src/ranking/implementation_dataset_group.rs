//! Models of one implementation trained on one dataset
//!
//! The group moves through `Open -> Grouped -> Ranked`. Models may only be
//! added while it is open; grouping them by standardized configuration closes
//! it for good.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::hyperparameter_analytics::HyperparameterAnalytics;
use super::hyperparameter_configuration::{HyperparameterConfiguration, RawConfiguration};
use super::metric_analytics::{uniform_weights, AggregatedMetrics, MetricAnalytics};
use crate::catalog::{CandidateModel, Dataset, DocumentId, Implementation, Metric};
use crate::config::RankingSettings;
use crate::error::{RecommenderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Open,
    Grouped,
    Ranked,
}

/// Models sharing one standardized configuration
#[derive(Debug, Clone)]
struct ConfigurationGroup {
    configuration: HyperparameterConfiguration,
    models: Vec<CandidateModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedConfiguration {
    pub fingerprint: String,
    pub configuration: HyperparameterConfiguration,
    pub score: f64,
    pub aggregated_metrics: AggregatedMetrics,
    pub model_ids: Vec<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetGroupReport {
    pub dataset_id: DocumentId,
    pub dataset_name: String,
    pub dataset_similarity: f64,
    pub model_count: usize,
    pub best_configuration: HyperparameterConfiguration,
    pub best_configuration_metrics: AggregatedMetrics,
    pub configurations: Vec<RankedConfiguration>,
}

pub struct ImplementationDatasetGroup {
    implementation: Arc<Implementation>,
    dataset: Arc<Dataset>,
    metric_analytics: Arc<RwLock<MetricAnalytics>>,
    hyperparameter_analytics: Arc<RwLock<HyperparameterAnalytics>>,
    settings: RankingSettings,
    models: Vec<(CandidateModel, RawConfiguration)>,
    configurations: Vec<ConfigurationGroup>,
    ranked: Vec<RankedConfiguration>,
    state: GroupState,
}

impl ImplementationDatasetGroup {
    pub fn new(
        implementation: Arc<Implementation>,
        dataset: Arc<Dataset>,
        metric_analytics: Arc<RwLock<MetricAnalytics>>,
        hyperparameter_analytics: Arc<RwLock<HyperparameterAnalytics>>,
        settings: RankingSettings,
    ) -> Self {
        Self {
            implementation,
            dataset,
            metric_analytics,
            hyperparameter_analytics,
            settings,
            models: Vec::new(),
            configurations: Vec::new(),
            ranked: Vec::new(),
            state: GroupState::Open,
        }
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub async fn add_model(&mut self, model: CandidateModel) -> Result<()> {
        if self.state != GroupState::Open {
            return Err(RecommenderError::ordering(format!(
                "model '{}' added to a closed group of '{}' on '{}'",
                model.id(),
                self.implementation.title,
                self.dataset.info.dataset_name
            )));
        }
        let raw = RawConfiguration::from_setup(&model.model.setup, &self.implementation);
        self.metric_analytics.write().await.add_metric_values(model.metrics())?;
        self.hyperparameter_analytics.write().await.add_configuration(&raw)?;
        self.models.push((model, raw));
        Ok(())
    }

    /// Group models by standardized configuration, in first-seen order.
    pub async fn group_models(&mut self) -> Result<()> {
        if self.state != GroupState::Open {
            return Err(RecommenderError::ordering("models are already grouped"));
        }
        let analytics = self.hyperparameter_analytics.read().await;
        if !analytics.are_standardizers_fitted() {
            return Err(RecommenderError::ordering(
                "standardizers must be fitted before models are grouped",
            ));
        }

        let mut index: HashMap<HyperparameterConfiguration, usize> = HashMap::new();
        let mut configurations: Vec<ConfigurationGroup> = Vec::new();
        for (model, raw) in &self.models {
            let configuration = analytics.standardize(raw)?;
            match index.get(&configuration) {
                Some(&i) => configurations[i].models.push(model.clone()),
                None => {
                    index.insert(configuration.clone(), configurations.len());
                    configurations.push(ConfigurationGroup {
                        configuration,
                        models: vec![model.clone()],
                    });
                }
            }
        }
        drop(analytics);

        debug!(
            implementation = %self.implementation.id,
            dataset = %self.dataset.id,
            models = self.models.len(),
            configurations = configurations.len(),
            "Grouped models by configuration"
        );
        self.configurations = configurations;
        self.state = GroupState::Grouped;
        Ok(())
    }

    /// Rank configurations by penalized score on the selected metrics.
    ///
    /// Groups the models first if that has not happened yet. Ranking an
    /// already ranked group is a no-op.
    pub async fn rank_configurations(&mut self, selected_metrics: &[Metric]) -> Result<()> {
        if let Some(metric) = selected_metrics.iter().find(|m| !m.is_numeric()) {
            return Err(RecommenderError::validation(format!(
                "metric '{}' is not numeric and cannot be ranked",
                metric
            )));
        }
        match self.state {
            GroupState::Ranked => return Ok(()),
            GroupState::Open => self.group_models().await?,
            GroupState::Grouped => {}
        }

        let weights = uniform_weights(selected_metrics);
        let analytics = self.metric_analytics.read().await;
        let mut ranked = Vec::with_capacity(self.configurations.len());
        for group in &self.configurations {
            let aggregated_metrics = analytics.aggregate_list(group.models.iter().map(|m| m.metrics()))?;
            let score = analytics
                .calculate_overall_score(&aggregated_metrics, &weights)
                .penalized(self.settings.lambda_penalty);
            ranked.push(RankedConfiguration {
                fingerprint: group.configuration.fingerprint(),
                configuration: group.configuration.clone(),
                score,
                aggregated_metrics,
                model_ids: group.models.iter().map(|m| m.id().clone()).collect(),
            });
        }
        drop(analytics);

        // stable: equal scores keep first-seen order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        self.ranked = ranked;
        self.state = GroupState::Ranked;
        Ok(())
    }

    fn require_ranked(&self) -> Result<()> {
        if self.state != GroupState::Ranked || self.ranked.is_empty() {
            return Err(RecommenderError::ordering("configurations have not been ranked"));
        }
        Ok(())
    }

    pub fn best_configuration(&self) -> Result<&RankedConfiguration> {
        self.require_ranked()?;
        self.ranked
            .first()
            .ok_or_else(|| RecommenderError::ordering("group has no configurations"))
    }

    pub fn metrics_of_best_configuration(&self) -> Result<&AggregatedMetrics> {
        Ok(&self.best_configuration()?.aggregated_metrics)
    }

    pub fn top_n_configurations(&self, n: usize) -> Result<&[RankedConfiguration]> {
        self.require_ranked()?;
        Ok(&self.ranked[..n.min(self.ranked.len())])
    }

    pub fn dataset_similarity(&self, target: &Dataset) -> f64 {
        self.dataset.similarity(target)
    }

    pub fn report(&self, target: &Dataset, top_n: usize) -> Result<DatasetGroupReport> {
        let best = self.best_configuration()?;
        Ok(DatasetGroupReport {
            dataset_id: self.dataset.id.clone(),
            dataset_name: self.dataset.info.dataset_name.clone(),
            dataset_similarity: self.dataset_similarity(target),
            model_count: self.models.len(),
            best_configuration: best.configuration.clone(),
            best_configuration_metrics: best.aggregated_metrics.clone(),
            configurations: self.top_n_configurations(top_n)?.to_vec(),
        })
    }
}
