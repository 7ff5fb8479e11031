//! Catalog Data Model
//!
//! Read-only documents produced by ingestion: datasets with their profiled
//! features, tasks, implementations and trained models.

pub mod dataset;
pub mod implementation;
pub mod metric;
pub mod model;
pub mod task;

pub use dataset::{
    CategoricalFeature, DataType, Dataset, DatasetInfo, DatetimeFeature, Features,
    NumericalFeature, TargetFeatureType, UnstructuredFeature,
};
pub use implementation::{Implementation, ParameterSpec, Software};
pub use metric::{Metric, MetricValue, MetricValueType, Metrics, OptimizationDirection};
pub use model::{CandidateModel, Model, Parameter, ParameterValue, Setup};
pub use task::{Task, TaskType};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of any catalog document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Dataset,
    Task,
    Implementation,
    Model,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::Dataset => "dataset",
            DocumentKind::Task => "task",
            DocumentKind::Implementation => "implementation",
            DocumentKind::Model => "model",
        };
        f.write_str(name)
    }
}

/// A resolved catalog document
#[derive(Debug, Clone)]
pub enum Document {
    Dataset(Arc<Dataset>),
    Task(Arc<Task>),
    Implementation(Arc<Implementation>),
    Model(Arc<Model>),
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Dataset(_) => DocumentKind::Dataset,
            Document::Task(_) => DocumentKind::Task,
            Document::Implementation(_) => DocumentKind::Implementation,
            Document::Model(_) => DocumentKind::Model,
        }
    }
}
