//! End-to-end recommendation scenarios
//!
//! Runs full queries through `ModelRecommender` against the shared fixture
//! catalog, once per store backend.

mod common;

use std::sync::Arc;
use tempfile::NamedTempFile;

use assistml::catalog::{DocumentKind, Metric, TaskType};
use assistml::query::{Preferences, Query, QueryRequest};
use assistml::ranking::{DistrustPointCategory, RecommendationReport};
use assistml::select::SimilarityLevel;
use assistml::store::DocumentStore;
use assistml::{ModelRecommender, RecommenderConfig, RecommenderError};

fn implementation_order(report: &RecommendationReport) -> Vec<String> {
    report
        .acceptable_models
        .iter()
        .map(|g| g.implementation_id.to_string())
        .collect()
}

fn assert_reference_report(report: &RecommendationReport) {
    assert_eq!(report.summary.similarity_level, SimilarityLevel::FeatureMetadata);
    assert_eq!(report.summary.acceptable_models, 3);
    assert_eq!(report.summary.nearly_acceptable_models, 0);
    assert!(report.nearly_acceptable_models.is_empty());
    assert_eq!(report.summary.distrust_score, 0);
    assert_eq!(
        report.summary.warnings,
        vec!["Dataset similarity level 3. Datasets used have features with similar meta feature values. Distrust Pts increased by 0"]
    );

    assert_eq!(implementation_order(report), vec!["rf", "svm"]);
    let scores: Vec<f64> = report.acceptable_models.iter().map(|g| g.overall_score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "scores not descending: {:?}", scores);

    // only the reference dataset contributes at tier 3
    for group in &report.acceptable_models {
        assert_eq!(group.dataset_groups.len(), 1);
        assert_eq!(group.dataset_groups[0].dataset_id.as_str(), "d");
    }
    let svm = &report.acceptable_models[1];
    assert_eq!(svm.dataset_groups[0].model_count, 2);
    assert_eq!(svm.dataset_groups[0].configurations.len(), 2);
    assert_eq!(svm.dataset_groups[0].configurations[0].model_ids[0].as_str(), "m2");
}

#[tokio::test]
async fn test_e2e_reference_dataset_in_memory() -> anyhow::Result<()> {
    let recommender = ModelRecommender::new(common::memory_store(), common::test_config());
    let report = recommender.build_report(&common::query("d")).await?;
    assert_reference_report(&report);
    Ok(())
}

#[tokio::test]
async fn test_e2e_reference_dataset_sqlite() -> anyhow::Result<()> {
    let db = NamedTempFile::new()?;
    let store = common::sqlite_store(db.path()).await?;
    let recommender = ModelRecommender::new(store, common::test_config());
    let report = recommender.build_report(&common::query("d")).await?;
    assert_reference_report(&report);
    Ok(())
}

#[tokio::test]
async fn test_e2e_reference_dataset_default_config() -> anyhow::Result<()> {
    // three candidates never reach min_samples = 3 within eps = 0.05, so all are noise
    let recommender = ModelRecommender::new(common::memory_store(), RecommenderConfig::default());
    let report = recommender.build_report(&common::query("d")).await?;

    assert_eq!(report.summary.similarity_level, SimilarityLevel::FeatureMetadata);
    assert!(report.acceptable_models.is_empty());
    assert!(report.nearly_acceptable_models.is_empty());
    assert_eq!(report.summary.acceptable_models, 0);
    assert_eq!(report.summary.nearly_acceptable_models, 0);
    assert_eq!(report.summary.distrust_points[&DistrustPointCategory::ClusterInsideRatioAcc], 3);
    assert_eq!(report.summary.distrust_points[&DistrustPointCategory::ClusterInsideRatioNacc], 0);
    assert_eq!(report.summary.distrust_score, 3);
    assert!(report
        .summary
        .warnings
        .contains(&"Acceptable models distrust points increased by 3".to_string()));

    let (candidates, _) = recommender.resolve_candidates(&common::query("d")).await?;
    let acceptability = recommender.classify_acceptability(&candidates, &common::preferences())?;
    assert!(acceptability.clusters.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_resolve_candidates_uses_only_reference_models() -> anyhow::Result<()> {
    let recommender = ModelRecommender::new(common::memory_store(), common::test_config());
    let (candidates, level) = recommender.resolve_candidates(&common::query("d")).await?;
    let mut ids: Vec<&str> = candidates.iter().map(|c| c.id().as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
    assert_eq!(level, SimilarityLevel::FeatureMetadata);
    Ok(())
}

#[tokio::test]
async fn test_classify_acceptability_of_reference_models() -> anyhow::Result<()> {
    let recommender = ModelRecommender::new(common::memory_store(), common::test_config());
    let (candidates, _) = recommender.resolve_candidates(&common::query("d")).await?;
    let acceptability = recommender.classify_acceptability(&candidates, &common::preferences())?;
    assert_eq!(acceptability.acceptable.len(), 3);
    assert!(acceptability.nearly_acceptable.is_empty());
    assert_eq!(acceptability.distrust.acceptable, 0);
    assert_eq!(acceptability.distrust.nearly_acceptable, 0);
    assert_eq!(acceptability.clusters.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_fallback_levels_add_distrust() -> anyhow::Result<()> {
    let recommender = ModelRecommender::new(common::memory_store(), common::test_config());

    let near = recommender.build_report(&common::query("d-near")).await?;
    assert_eq!(near.summary.similarity_level, SimilarityLevel::DataTypeRatios);
    assert_eq!(near.summary.distrust_points[&DistrustPointCategory::DatasetSimilarity], 1);

    let wide = recommender.build_report(&common::query("d-wide")).await?;
    assert_eq!(wide.summary.similarity_level, SimilarityLevel::DataTypes);
    assert_eq!(wide.summary.distrust_points[&DistrustPointCategory::DatasetSimilarity], 2);

    let dates = recommender.build_report(&common::query("d-dates")).await?;
    assert_eq!(dates.summary.similarity_level, SimilarityLevel::TaskType);
    assert!(dates.summary.warnings[0].starts_with("Dataset similarity level 0."));
    assert!(dates.summary.acceptable_models + dates.summary.nearly_acceptable_models <= 6);
    Ok(())
}

#[tokio::test]
async fn test_no_models_for_task_type_is_empty_result() {
    let recommender = ModelRecommender::new(common::memory_store(), common::test_config());

    // a task exists but no model was trained on it
    let regression = Query::new(TaskType::Regression, "d", Preferences::new().with(Metric::RootMeanSquaredError, 0.2));
    let err = recommender.build_report(&regression).await.unwrap_err();
    assert!(err.is_no_recommendation());

    let clustering = Query::new(TaskType::Clustering, "d", common::preferences());
    let err = recommender.build_report(&clustering).await.unwrap_err();
    assert!(matches!(err, RecommenderError::EmptyResult { task_type: TaskType::Clustering }));

    let err = recommender.resolve_candidates(&clustering).await.unwrap_err();
    assert!(matches!(err, RecommenderError::TaskTypeNotFound(TaskType::Clustering)));
}

#[tokio::test]
async fn test_missing_dataset_is_not_found() {
    let recommender = ModelRecommender::new(common::memory_store(), common::test_config());
    let err = tokio_test::assert_err!(recommender.build_report(&common::query("nope")).await);
    assert!(matches!(err, RecommenderError::NotFound { kind: DocumentKind::Dataset, .. }));
}

#[tokio::test]
async fn test_invalid_preferences_rejected_before_store_access() {
    let store = common::memory_store();
    let recommender = ModelRecommender::new(store.clone(), common::test_config());

    let query = Query::new(
        TaskType::BinaryClassification,
        "d",
        Preferences::new().with(Metric::ConfusionMatrix, 0.5),
    );
    let err = recommender.build_report(&query).await.unwrap_err();
    assert!(matches!(err, RecommenderError::Validation(_)));

    let query = Query::new(TaskType::BinaryClassification, "d", Preferences::new().with(Metric::Accuracy, 1.5));
    assert!(matches!(recommender.build_report(&query).await, Err(RecommenderError::Validation(_))));
    assert_eq!(store.resolve_calls(), 0);
}

#[tokio::test]
async fn test_query_request_boundary() -> anyhow::Result<()> {
    let request: QueryRequest = serde_json::from_value(serde_json::json!({
        "task_type": "binary classification",
        "dataset_id": "d",
        "preferences": { "accuracy": 1.0, "recall": 0.5 }
    }))?;
    let query = Query::try_from(request)?;
    assert_eq!(query, common::query("d"));

    let unknown: QueryRequest = serde_json::from_value(serde_json::json!({
        "task_type": "binary classification",
        "dataset_id": "d",
        "preferences": { "happiness": 1.0 }
    }))?;
    assert!(matches!(Query::try_from(unknown), Err(RecommenderError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn test_report_round_trips_through_json() -> anyhow::Result<()> {
    let recommender = ModelRecommender::new(common::memory_store(), common::test_config());
    let report = recommender.build_report(&common::query("d-wide")).await?;
    let json = serde_json::to_string_pretty(&report)?;
    let back: RecommendationReport = serde_json::from_str(&json)?;
    assert_eq!(back, report);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_and_memory_agree_on_tiers() -> anyhow::Result<()> {
    let db = NamedTempFile::new()?;
    let sqlite: Arc<dyn DocumentStore> = common::sqlite_store(db.path()).await?;
    let memory: Arc<dyn DocumentStore> = common::memory_store();

    for target in ["d", "d-near", "d-wide", "d-dates"] {
        let from_sqlite = ModelRecommender::new(sqlite.clone(), common::test_config())
            .resolve_candidates(&common::query(target))
            .await?;
        let from_memory = ModelRecommender::new(memory.clone(), common::test_config())
            .resolve_candidates(&common::query(target))
            .await?;
        let ids = |c: &[assistml::catalog::CandidateModel]| {
            let mut ids: Vec<String> = c.iter().map(|m| m.id().to_string()).collect();
            ids.sort();
            ids
        };
        assert_eq!(from_sqlite.1, from_memory.1, "level differs for {}", target);
        assert_eq!(ids(&from_sqlite.0), ids(&from_memory.0), "candidates differ for {}", target);
    }
    Ok(())
}
