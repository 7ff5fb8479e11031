//! Recommendation queries
//!
//! `QueryRequest` is the loosely-typed form a request layer hands over;
//! converting it into a `Query` validates every field once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{DocumentId, Metric, TaskType};
use crate::error::{RecommenderError, Result};

/// Per-metric preference values in [0, 1]
///
/// A positive value selects the metric for ranking and doubles as the
/// tolerance width of its acceptable band. Zero ignores the metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(BTreeMap<Metric, f64>);

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: Metric, weight: f64) -> Self {
        self.0.insert(metric, weight);
        self
    }

    pub fn weight(&self, metric: Metric) -> f64 {
        self.0.get(&metric).copied().unwrap_or(0.0)
    }

    /// Selected metrics with their band widths, in metric order.
    pub fn selected(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.0.iter().filter(|(_, w)| **w > 0.0).map(|(m, w)| (*m, *w))
    }

    pub fn selected_metrics(&self) -> Vec<Metric> {
        self.selected().map(|(m, _)| m).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Metric, &f64)> {
        self.0.iter()
    }

    pub fn validate(&self) -> Result<()> {
        for (metric, weight) in &self.0 {
            if !(0.0..=1.0).contains(weight) {
                return Err(RecommenderError::validation(format!(
                    "preference for '{}' must lie in [0, 1], got {}",
                    metric, weight
                )));
            }
            if *weight > 0.0 && !metric.is_numeric() {
                return Err(RecommenderError::validation(format!(
                    "metric '{}' is not numeric and cannot be ranked",
                    metric
                )));
            }
        }
        if self.selected().next().is_none() {
            return Err(RecommenderError::validation("at least one metric needs a positive preference"));
        }
        Ok(())
    }
}

impl FromIterator<(Metric, f64)> for Preferences {
    fn from_iter<I: IntoIterator<Item = (Metric, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub task_type: TaskType,
    pub dataset_id: DocumentId,
    #[serde(default)]
    pub semantic_types: Vec<String>,
    pub preferences: Preferences,
}

impl Query {
    pub fn new(task_type: TaskType, dataset_id: impl Into<DocumentId>, preferences: Preferences) -> Self {
        Self {
            task_type,
            dataset_id: dataset_id.into(),
            semantic_types: Vec::new(),
            preferences,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dataset_id.as_str().trim().is_empty() {
            return Err(RecommenderError::validation("query needs a dataset id"));
        }
        self.preferences.validate()
    }
}

/// A query as received from outside, keyed by strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub task_type: String,
    pub dataset_id: String,
    #[serde(default)]
    pub semantic_types: Vec<String>,
    pub preferences: BTreeMap<String, f64>,
}

impl TryFrom<QueryRequest> for Query {
    type Error = RecommenderError;

    fn try_from(request: QueryRequest) -> Result<Self> {
        let task_type: TaskType = request.task_type.parse().map_err(RecommenderError::Validation)?;
        let preferences = request
            .preferences
            .iter()
            .map(|(key, weight)| {
                key.parse::<Metric>()
                    .map(|m| (m, *weight))
                    .map_err(RecommenderError::Validation)
            })
            .collect::<Result<Preferences>>()?;

        let query = Query {
            task_type,
            dataset_id: DocumentId::new(request.dataset_id),
            semantic_types: request.semantic_types,
            preferences,
        };
        query.validate()?;
        Ok(query)
    }
}
