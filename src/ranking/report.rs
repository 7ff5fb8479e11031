//! Recommendation report
//!
//! A `Report` lives for one query. It moves through
//! `Created -> ModelsSet -> Ranked -> Reported`: the classified models are
//! fanned out into implementation groups, ranking runs exactly once, and the
//! serializable `RecommendationReport` is produced from the cached ranking as
//! often as it is asked for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use super::document_cache::DocumentCache;
use super::implementation_group::{ImplementationGroup, ImplementationGroupReport};
use super::lock_table::LockTable;
use super::metric_analytics::MetricAnalytics;
use crate::catalog::{CandidateModel, Dataset, DocumentId};
use crate::cluster::AcceptabilityDistrust;
use crate::config::RankingSettings;
use crate::error::{RecommenderError, Result};
use crate::query::Query;
use crate::select::SimilarityLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelGroup {
    AcceptableModels,
    NearlyAcceptableModels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistrustPointCategory {
    DatasetSimilarity,
    MetricsSupport,
    ClusterInsideRatioAcc,
    ClusterInsideRatioNacc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    Created,
    ModelsSet,
    Ranked,
    Reported,
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportState::Created => "created",
            ReportState::ModelsSet => "models_set",
            ReportState::Ranked => "ranked",
            ReportState::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// Indexed by the dataset similarity distrust points.
const DATASET_SIMILARITY_WARNINGS: [&str; 4] = [
    "Dataset similarity level 3. Datasets used have features with similar meta feature values. Distrust Pts increased by 0",
    "Dataset similarity level 2. Datasets used have similar ratios of data types. Distrust Pts increased by 1",
    "Dataset similarity level 1. Datasets used shared data types. Distrust Pts increased by 2",
    "Dataset similarity level 0. Only the type of task and output match. Distrust Pts increased by 3",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub similarity_level: SimilarityLevel,
    pub distrust_points: BTreeMap<DistrustPointCategory, u32>,
    pub distrust_score: u32,
    pub warnings: Vec<String>,
    pub acceptable_models: usize,
    pub nearly_acceptable_models: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub query: Query,
    pub summary: ReportSummary,
    pub acceptable_models: Vec<ImplementationGroupReport>,
    pub nearly_acceptable_models: Vec<ImplementationGroupReport>,
}

type GroupKey = (ModelGroup, DocumentId);

/// Implementation groups of both model groups, best first
struct Ranking {
    acceptable: Vec<Arc<ImplementationGroup>>,
    nearly_acceptable: Vec<Arc<ImplementationGroup>>,
}

pub struct Report {
    query: Query,
    target: Arc<Dataset>,
    cache: Arc<DocumentCache>,
    metric_analytics: Arc<RwLock<MetricAnalytics>>,
    settings: RankingSettings,
    similarity_level: SimilarityLevel,
    distrust_points: BTreeMap<DistrustPointCategory, u32>,
    state: Mutex<ReportState>,
    model_counts: RwLock<BTreeMap<ModelGroup, usize>>,
    groups: RwLock<HashMap<GroupKey, Arc<ImplementationGroup>>>,
    group_locks: LockTable<GroupKey>,
    ranking: Mutex<Option<Arc<Ranking>>>,
}

impl Report {
    pub fn new(query: Query, target: Arc<Dataset>, cache: Arc<DocumentCache>, settings: RankingSettings) -> Self {
        let mut report = Self {
            query,
            target,
            cache,
            metric_analytics: Arc::new(RwLock::new(MetricAnalytics::new())),
            settings,
            similarity_level: SimilarityLevel::TaskType,
            distrust_points: BTreeMap::new(),
            state: Mutex::new(ReportState::Created),
            model_counts: RwLock::new(BTreeMap::new()),
            groups: RwLock::new(HashMap::new()),
            group_locks: LockTable::new(),
            ranking: Mutex::new(None),
        };
        report.set_similarity_level(SimilarityLevel::TaskType);
        report
    }

    pub async fn state(&self) -> ReportState {
        *self.state.lock().await
    }

    pub fn set_similarity_level(&mut self, level: SimilarityLevel) {
        self.similarity_level = level;
        self.distrust_points
            .insert(DistrustPointCategory::DatasetSimilarity, 3 - u32::from(level.as_u8()));
    }

    pub fn set_distrust_points(&mut self, distrust: AcceptabilityDistrust) {
        self.distrust_points
            .insert(DistrustPointCategory::MetricsSupport, distrust.metrics_support);
        self.distrust_points
            .insert(DistrustPointCategory::ClusterInsideRatioAcc, distrust.acceptable);
        self.distrust_points
            .insert(DistrustPointCategory::ClusterInsideRatioNacc, distrust.nearly_acceptable);
    }

    pub fn distrust_points(&self) -> &BTreeMap<DistrustPointCategory, u32> {
        &self.distrust_points
    }

    pub fn distrust_score(&self) -> u32 {
        self.distrust_points.values().sum()
    }

    pub fn distrust_warnings(&self) -> Vec<String> {
        let points = |category| self.distrust_points.get(&category).copied().unwrap_or(0);

        let similarity = points(DistrustPointCategory::DatasetSimilarity).min(3) as usize;
        let mut warnings = vec![DATASET_SIMILARITY_WARNINGS[similarity].to_string()];

        let support = points(DistrustPointCategory::MetricsSupport);
        if support > 0 {
            warnings.push(format!(
                "Not all requested metric boundaries could be applied. Distrust points increased by {}",
                support
            ));
        }
        let acceptable = points(DistrustPointCategory::ClusterInsideRatioAcc);
        if acceptable > 0 {
            warnings.push(format!("Acceptable models distrust points increased by {}", acceptable));
        }
        let nearly = points(DistrustPointCategory::ClusterInsideRatioNacc);
        if nearly > 0 {
            warnings.push(format!("Nearly acceptable models distrust points increased by {}", nearly));
        }
        warnings
    }

    /// Fan every classified model out into its implementation group.
    ///
    /// Allowed once; all insertions complete before the report moves on.
    pub async fn set_models(
        &self,
        acceptable: &[CandidateModel],
        nearly_acceptable: &[CandidateModel],
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state != ReportState::Created {
            return Err(RecommenderError::ordering(format!(
                "models can only be set on a new report, this one is {}",
                *state
            )));
        }

        let insertions = acceptable
            .iter()
            .map(|m| (ModelGroup::AcceptableModels, m))
            .chain(nearly_acceptable.iter().map(|m| (ModelGroup::NearlyAcceptableModels, m)))
            .map(|(group, model)| self.add_model(group, model.clone()));
        futures::future::try_join_all(insertions).await?;

        let mut counts = self.model_counts.write().await;
        counts.insert(ModelGroup::AcceptableModels, acceptable.len());
        counts.insert(ModelGroup::NearlyAcceptableModels, nearly_acceptable.len());
        let group_count = self.groups.read().await.len();
        info!(
            acceptable = acceptable.len(),
            nearly_acceptable = nearly_acceptable.len(),
            groups = group_count,
            "Report populated"
        );
        *state = ReportState::ModelsSet;
        Ok(())
    }

    async fn add_model(&self, group: ModelGroup, model: CandidateModel) -> Result<()> {
        let key = (group, model.implementation_id().clone());
        let implementation_group = self.implementation_group(key).await?;
        implementation_group.add_model(model).await
    }

    async fn implementation_group(&self, key: GroupKey) -> Result<Arc<ImplementationGroup>> {
        if let Some(group) = self.groups.read().await.get(&key) {
            return Ok(Arc::clone(group));
        }

        let lock = self.group_locks.lock_for(&key).await;
        let _guard = lock.lock().await;
        if let Some(group) = self.groups.read().await.get(&key) {
            return Ok(Arc::clone(group));
        }

        let group = Arc::new(
            ImplementationGroup::create(
                &key.1,
                Arc::clone(&self.cache),
                Arc::clone(&self.metric_analytics),
                self.settings.clone(),
            )
            .await?,
        );
        self.groups.write().await.insert(key, Arc::clone(&group));
        Ok(group)
    }

    /// Rank everything once; later calls get the cached ranking.
    async fn rank(&self, top_n: usize) -> Result<Arc<Ranking>> {
        let mut cached = self.ranking.lock().await;
        if let Some(ranking) = cached.as_ref() {
            return Ok(Arc::clone(ranking));
        }
        if *self.state.lock().await == ReportState::Created {
            return Err(RecommenderError::ordering("report ranked before its models were set"));
        }

        {
            let mut analytics = self.metric_analytics.write().await;
            if !analytics.is_fitted() {
                analytics.fit_normalizers()?;
            }
        }

        let selected = self.query.preferences.selected_metrics();
        let groups: Vec<(GroupKey, Arc<ImplementationGroup>)> = self
            .groups
            .read()
            .await
            .iter()
            .map(|(key, group)| (key.clone(), Arc::clone(group)))
            .collect();

        let mut acceptable = Vec::new();
        let mut nearly_acceptable = Vec::new();
        for ((model_group, implementation_id), group) in groups {
            group.rank_datasets(&self.target, &selected).await?;
            let score = group.calculate_overall_score(&selected, top_n).await?;
            let entry = (score, implementation_id, group);
            match model_group {
                ModelGroup::AcceptableModels => acceptable.push(entry),
                ModelGroup::NearlyAcceptableModels => nearly_acceptable.push(entry),
            }
        }

        let order = |mut entries: Vec<(f64, DocumentId, Arc<ImplementationGroup>)>| {
            entries.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
            entries.into_iter().map(|(_, _, group)| group).collect::<Vec<_>>()
        };
        let ranking = Arc::new(Ranking {
            acceptable: order(acceptable),
            nearly_acceptable: order(nearly_acceptable),
        });
        info!(
            acceptable = ranking.acceptable.len(),
            nearly_acceptable = ranking.nearly_acceptable.len(),
            "Ranked implementation groups"
        );

        *self.state.lock().await = ReportState::Ranked;
        *cached = Some(Arc::clone(&ranking));
        Ok(ranking)
    }

    /// Produce the report: the `top_k` implementation groups of each model
    /// group, each with its `top_n` dataset groups.
    pub async fn generate_report(&self, top_k: usize, top_n: usize) -> Result<RecommendationReport> {
        let ranking = self.rank(top_n).await?;

        let mut acceptable_models = Vec::new();
        for group in ranking.acceptable.iter().take(top_k) {
            acceptable_models.push(group.generate_report(&self.target, top_n).await?);
        }
        let mut nearly_acceptable_models = Vec::new();
        for group in ranking.nearly_acceptable.iter().take(top_k) {
            nearly_acceptable_models.push(group.generate_report(&self.target, top_n).await?);
        }

        let counts = self.model_counts.read().await;
        let summary = ReportSummary {
            similarity_level: self.similarity_level,
            distrust_points: self.distrust_points.clone(),
            distrust_score: self.distrust_score(),
            warnings: self.distrust_warnings(),
            acceptable_models: counts.get(&ModelGroup::AcceptableModels).copied().unwrap_or(0),
            nearly_acceptable_models: counts.get(&ModelGroup::NearlyAcceptableModels).copied().unwrap_or(0),
        };
        drop(counts);

        *self.state.lock().await = ReportState::Reported;
        Ok(RecommendationReport {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            query: self.query.clone(),
            summary,
            acceptable_models,
            nearly_acceptable_models,
        })
    }
}
