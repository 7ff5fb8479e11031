//! Similarity cascade tests
//!
//! Every tier must be a subset of the tier below it, and resolution must fall
//! back tier by tier.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use assistml::catalog::{Dataset, DatasetInfo, DocumentId, Features, TargetFeatureType, TaskType};
use assistml::config::SelectionSettings;
use assistml::select::{Resolution, SimilarityLevel, SimilarityResolver, TierTasks};
use assistml::store::{DocumentStore, InMemoryStore, RetryPolicy};

fn resolver(store: Arc<dyn DocumentStore>) -> SimilarityResolver {
    SimilarityResolver::new(store, SelectionSettings::default(), RetryPolicy::none())
}

fn ids(tiers: &TierTasks, level: SimilarityLevel) -> BTreeSet<String> {
    tiers.at(level).iter().map(|t| t.id.to_string()).collect()
}

fn assert_monotone(tiers: &TierTasks) {
    let t0 = ids(tiers, SimilarityLevel::TaskType);
    let t1 = ids(tiers, SimilarityLevel::DataTypes);
    let t2 = ids(tiers, SimilarityLevel::DataTypeRatios);
    let t3 = ids(tiers, SimilarityLevel::FeatureMetadata);
    assert!(t3.is_subset(&t2), "tier 3 {:?} not within tier 2 {:?}", t3, t2);
    assert!(t2.is_subset(&t1), "tier 2 {:?} not within tier 1 {:?}", t2, t1);
    assert!(t1.is_subset(&t0), "tier 1 {:?} not within tier 0 {:?}", t1, t0);
}

async fn target(store: &InMemoryStore, id: &str) -> Arc<Dataset> {
    match store
        .resolve_document(assistml::catalog::DocumentKind::Dataset, &DocumentId::new(id))
        .await
        .expect("fixture dataset exists")
    {
        assistml::catalog::Document::Dataset(d) => d,
        other => panic!("unexpected document {:?}", other.kind()),
    }
}

#[tokio::test]
async fn test_fixture_tiers_are_nested() {
    let store = common::memory_store();
    let resolver = resolver(store.clone());

    for id in ["d", "d-ratio", "d-other", "d-near", "d-wide", "d-dates"] {
        let dataset = target(&store, id).await;
        let tiers = resolver
            .tier_tasks(TaskType::BinaryClassification, &dataset)
            .await
            .unwrap();
        assert_monotone(&tiers);
    }
}

#[tokio::test]
async fn test_reference_dataset_tiers() {
    let store = common::memory_store();
    let dataset = target(&store, "d").await;
    let tiers = resolver(store)
        .tier_tasks(TaskType::BinaryClassification, &dataset)
        .await
        .unwrap();

    let set = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
    assert_eq!(ids(&tiers, SimilarityLevel::TaskType), set(&["t-d", "t-other", "t-ratio"]));
    assert_eq!(ids(&tiers, SimilarityLevel::DataTypes), set(&["t-d", "t-ratio"]));
    assert_eq!(ids(&tiers, SimilarityLevel::DataTypeRatios), set(&["t-d"]));
    assert_eq!(ids(&tiers, SimilarityLevel::FeatureMetadata), set(&["t-d"]));
}

#[tokio::test]
async fn test_resolution_falls_back_tier_by_tier() {
    let store = common::memory_store();
    let resolver = resolver(store.clone());

    let expectations = [
        ("d", SimilarityLevel::FeatureMetadata, 3),
        ("d-near", SimilarityLevel::DataTypeRatios, 3),
        ("d-wide", SimilarityLevel::DataTypes, 5),
        ("d-dates", SimilarityLevel::TaskType, 6),
    ];
    for (id, expected_level, expected_models) in expectations {
        let dataset = target(&store, id).await;
        match resolver.resolve(TaskType::BinaryClassification, &dataset).await.unwrap() {
            Resolution::Candidates { models, level } => {
                assert_eq!(level, expected_level, "level for {}", id);
                assert_eq!(models.len(), expected_models, "models for {}", id);
            }
            Resolution::Empty => panic!("{} resolved to nothing", id),
        }
    }
}

#[tokio::test]
async fn test_empty_tier_zero_is_terminal() {
    let store = common::memory_store();
    let dataset = target(&store, "d").await;
    let resolver = resolver(store);

    let tiers = resolver.tier_tasks(TaskType::SurvivalAnalysis, &dataset).await.unwrap();
    assert!(tiers.is_empty());
    assert!(matches!(
        resolver.resolve(TaskType::SurvivalAnalysis, &dataset).await.unwrap(),
        Resolution::Empty
    ));
}

fn generated_dataset(i: usize) -> Dataset {
    // sweep ratio profiles, some with zero columns
    let numeric = (i % 7) as f64 / 6.0;
    let datetime = if i % 3 == 0 { 0.0 } else { (1.0 - numeric) / 3.0 };
    let categorical = 1.0 - numeric - datetime;
    Dataset {
        id: DocumentId::new(format!("g{:02}", i)),
        info: DatasetInfo {
            dataset_name: format!("generated {}", i),
            target_label: "y".into(),
            target_feature_type: TargetFeatureType::Binary,
            observations: 100 + i as u64,
            analyzed_observations: 100,
            features: 3,
            numeric_ratio: numeric,
            categorical_ratio: categorical,
            datetime_ratio: datetime,
            unstructured_ratio: 0.0,
            analyzed_features: Vec::new(),
            discarded_features: Vec::new(),
            analysis_time: 0.0,
        },
        features: Features::default(),
    }
}

#[tokio::test]
async fn test_generated_catalog_tiers_are_nested() {
    let mut store = InMemoryStore::new();
    let datasets: Vec<Dataset> = (0..30).map(generated_dataset).collect();
    for (i, dataset) in datasets.iter().enumerate() {
        store.insert_dataset(dataset.clone());
        store.insert_task(assistml::catalog::Task {
            id: DocumentId::new(format!("task-{:02}", i)),
            task_type: TaskType::BinaryClassification,
            dataset_id: dataset.id.clone(),
            target_name: None,
            related_implementations: Vec::new(),
        });
    }
    let store = Arc::new(store);
    let resolver = resolver(store);

    for dataset in &datasets {
        let tiers = resolver
            .tier_tasks(TaskType::BinaryClassification, dataset)
            .await
            .unwrap();
        assert_monotone(&tiers);
        // a dataset always shares every tier with itself, except feature
        // matching which needs features to compare
        let own = format!("task-{}", &dataset.id.as_str()[1..]);
        assert!(ids(&tiers, SimilarityLevel::DataTypeRatios).contains(&own));
    }
}
