//! Model Recommender Service
//!
//! The entry point a request layer calls. Wires the document store, the
//! similarity resolver, the acceptability classifier and the report
//! together for one query at a time.

use std::sync::Arc;
use tracing::info;

use crate::catalog::{CandidateModel, Dataset};
use crate::cluster::{Acceptability, AcceptabilityClassifier};
use crate::config::RecommenderConfig;
use crate::error::{RecommenderError, Result};
use crate::query::{Preferences, Query};
use crate::ranking::{DocumentCache, RecommendationReport, Report};
use crate::select::{Resolution, SimilarityLevel, SimilarityResolver};
use crate::store::{DocumentStore, RetryPolicy};

pub struct ModelRecommender {
    store: Arc<dyn DocumentStore>,
    config: RecommenderConfig,
}

impl ModelRecommender {
    pub fn new(store: Arc<dyn DocumentStore>, config: RecommenderConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config.retry)
    }

    fn resolver(&self) -> SimilarityResolver {
        SimilarityResolver::new(Arc::clone(&self.store), self.config.selection.clone(), self.retry_policy())
    }

    /// Candidate models of the strictest similarity tier that has any.
    ///
    /// Fails with `NotFound` when the query's dataset is absent and with
    /// `TaskTypeNotFound` when no model of the task type exists at all.
    pub async fn resolve_candidates(&self, query: &Query) -> Result<(Vec<CandidateModel>, SimilarityLevel)> {
        let cache = DocumentCache::new(Arc::clone(&self.store), self.retry_policy());
        let target = cache.dataset(&query.dataset_id).await?;
        match self.resolver().resolve(query.task_type, &target).await? {
            Resolution::Candidates { models, level } => Ok((models, level)),
            Resolution::Empty => Err(RecommenderError::TaskTypeNotFound(query.task_type)),
        }
    }

    pub fn classify_acceptability(
        &self,
        candidates: &[CandidateModel],
        preferences: &Preferences,
    ) -> Result<Acceptability> {
        AcceptabilityClassifier::new(self.config.clustering.clone()).classify(candidates, preferences)
    }

    /// Run the whole pipeline for one query.
    ///
    /// An empty candidate population yields `EmptyResult`, which callers
    /// should report as "no recommendation possible".
    #[tracing::instrument(skip(self, query), fields(dataset = %query.dataset_id, task_type = %query.task_type))]
    pub async fn build_report(&self, query: &Query) -> Result<RecommendationReport> {
        query.validate()?;

        let cache = Arc::new(DocumentCache::new(Arc::clone(&self.store), self.retry_policy()));
        let target: Arc<Dataset> = cache.dataset(&query.dataset_id).await?;

        let (candidates, level) = match self.resolver().resolve(query.task_type, &target).await? {
            Resolution::Candidates { models, level } => (models, level),
            Resolution::Empty => {
                return Err(RecommenderError::EmptyResult {
                    task_type: query.task_type,
                })
            }
        };

        let acceptability = self.classify_acceptability(&candidates, &query.preferences)?;
        info!(
            candidates = candidates.len(),
            level = %level,
            acceptable = acceptability.acceptable.len(),
            nearly_acceptable = acceptability.nearly_acceptable.len(),
            distrust = ?acceptability.distrust,
            "Classified candidates"
        );

        let mut report = Report::new(query.clone(), target, cache, self.config.ranking.clone());
        report.set_similarity_level(level);
        report.set_distrust_points(acceptability.distrust);
        report
            .set_models(&acceptability.acceptable, &acceptability.nearly_acceptable)
            .await?;

        let settings = &self.config.report;
        let output = report.generate_report(settings.top_k, settings.top_n).await?;
        info!(
            report = %output.id,
            distrust_score = output.summary.distrust_score,
            "Report generated"
        );
        Ok(output)
    }
}
