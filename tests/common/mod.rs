//! Shared catalog fixture for the integration suites
//!
//! Dataset `d` is the reference dataset with three binary classification
//! models. `d-ratio` shares its data-type pattern with ratios far apart,
//! `d-other` has a different pattern. The remaining datasets carry no tasks
//! and only serve as query targets:
//! - `d-near`: ratios within tolerance of `d`, unrelated features (tier 2)
//! - `d-wide`: same pattern as `d`, ratios far apart (tier 1)
//! - `d-dates`: a pattern no catalog dataset shares (tier 0)

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;

use assistml::catalog::{Metric, TaskType};
use assistml::config::RecommenderConfig;
use assistml::query::{Preferences, Query};
use assistml::store::{CatalogSnapshot, InMemoryStore, SqliteStore};

fn dataset(id: &str, numeric: f64, categorical: f64, datetime: f64, features: Value) -> Value {
    json!({
        "id": id,
        "info": {
            "dataset_name": id,
            "target_label": "churn",
            "target_feature_type": "binary",
            "observations": 1000,
            "features": 4,
            "numeric_ratio": numeric,
            "categorical_ratio": categorical,
            "datetime_ratio": datetime,
            "unstructured_ratio": 0.0
        },
        "features": features
    })
}

fn reference_features() -> Value {
    json!({
        "numerical_features": {
            "tenure": { "monotonous_filtering": 0.30, "mutual_info": 0.20 },
            "charges": { "monotonous_filtering": 0.10, "mutual_info": 0.05 },
            "calls": { "monotonous_filtering": 0.60, "mutual_info": 0.12 }
        },
        "categorical_features": {
            "contract": { "monotonous_filtering": 0.50, "mutual_info": 0.10, "nr_levels": 3 }
        }
    })
}

fn unrelated_features() -> Value {
    json!({
        "numerical_features": {
            "x1": { "monotonous_filtering": 0.95, "mutual_info": 0.90 },
            "x2": { "monotonous_filtering": 0.85, "mutual_info": 0.70 }
        }
    })
}

fn task(id: &str, task_type: &str, dataset_id: &str) -> Value {
    json!({ "id": id, "task_type": task_type, "dataset_id": dataset_id })
}

fn model(id: &str, implementation: &str, task: &str, parameters: Value, accuracy: f64, recall: f64) -> Value {
    json!({
        "id": id,
        "setup": {
            "hyper_parameters": parameters,
            "implementation_id": implementation,
            "task_id": task
        },
        "metrics": { "accuracy": accuracy, "recall": recall, "confusion_matrix": "[[1, 0], [0, 1]]" }
    })
}

pub fn catalog_json() -> Value {
    json!({
        "datasets": [
            dataset("d", 0.75, 0.25, 0.0, reference_features()),
            dataset("d-ratio", 0.5, 0.5, 0.0, unrelated_features()),
            dataset("d-other", 1.0, 0.0, 0.0, unrelated_features()),
            dataset("d-near", 0.77, 0.23, 0.0, unrelated_features()),
            dataset("d-wide", 0.3, 0.7, 0.0, unrelated_features()),
            dataset("d-dates", 0.5, 0.0, 0.5, unrelated_features())
        ],
        "tasks": [
            task("t-d", "binary classification", "d"),
            task("t-ratio", "binary classification", "d-ratio"),
            task("t-other", "binary classification", "d-other"),
            task("t-reg", "regression", "d")
        ],
        "implementations": [
            {
                "id": "rf",
                "title": "sklearn.ensemble.RandomForestClassifier",
                "dependencies": [{ "name": "scikit-learn", "version": "1.4" }],
                "parameters": {
                    "n_estimators": { "type": "int", "default_value": 100 },
                    "max_depth": { "type": "int", "default_value": 8 }
                }
            },
            {
                "id": "svm",
                "title": "sklearn.svm.SVC",
                "dependencies": [{ "name": "scikit-learn", "version": "1.4" }],
                "parameters": {
                    "C": { "type": "float", "default_value": 1.0 },
                    "kernel": { "type": "str", "default_value": "rbf" }
                }
            }
        ],
        "models": [
            model("m1", "rf", "t-d", json!([{ "name": "n_estimators", "value": 200 }]), 0.95, 0.90),
            model("m2", "svm", "t-d", json!([{ "name": "C", "value": 1.0 }]), 0.94, 0.91),
            model("m3", "svm", "t-d", json!([{ "name": "C", "value": 100.0 }]), 0.80, 0.70),
            model("m4", "rf", "t-ratio", json!([]), 0.99, 0.99),
            model("m5", "svm", "t-ratio", json!([{ "name": "kernel", "value": "linear" }]), 0.60, 0.50),
            model("m6", "rf", "t-other", json!([]), 0.70, 0.70)
        ]
    })
}

pub fn snapshot() -> CatalogSnapshot {
    serde_json::from_value(catalog_json()).expect("fixture catalog deserializes")
}

pub fn memory_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::from_snapshot(snapshot()))
}

pub async fn sqlite_store(path: &std::path::Path) -> anyhow::Result<Arc<SqliteStore>> {
    let store = SqliteStore::new(path).await?;
    store.import_snapshot(snapshot()).await?;
    Ok(Arc::new(store))
}

/// Clustering loose enough to give the three `d` models two clusters.
pub fn test_config() -> RecommenderConfig {
    let mut config = RecommenderConfig::default();
    config.clustering.eps = 0.25;
    config.clustering.min_samples = 1;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 5;
    config
}

pub fn preferences() -> Preferences {
    Preferences::new().with(Metric::Accuracy, 1.0).with(Metric::Recall, 0.5)
}

pub fn query(dataset_id: &str) -> Query {
    Query::new(TaskType::BinaryClassification, dataset_id, preferences())
}
