//! Task documents

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "binary classification", alias = "binary_classification")]
    BinaryClassification,
    #[serde(rename = "multiclass classification", alias = "multiclass_classification")]
    MulticlassClassification,
    #[serde(rename = "regression")]
    Regression,
    #[serde(rename = "clustering")]
    Clustering,
    #[serde(rename = "learning curve", alias = "learning_curve")]
    LearningCurve,
    #[serde(rename = "datastream classification", alias = "datastream_classification")]
    DatastreamClassification,
    #[serde(rename = "survival analysis", alias = "survival_analysis")]
    SurvivalAnalysis,
    #[serde(rename = "subgroup discovery", alias = "subgroup_discovery")]
    SubgroupDiscovery,
    #[serde(rename = "multitask regression", alias = "multitask_regression")]
    MultitaskRegression,
}

impl TaskType {
    pub const ALL: [TaskType; 9] = [
        TaskType::BinaryClassification,
        TaskType::MulticlassClassification,
        TaskType::Regression,
        TaskType::Clustering,
        TaskType::LearningCurve,
        TaskType::DatastreamClassification,
        TaskType::SurvivalAnalysis,
        TaskType::SubgroupDiscovery,
        TaskType::MultitaskRegression,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::BinaryClassification => "binary classification",
            TaskType::MulticlassClassification => "multiclass classification",
            TaskType::Regression => "regression",
            TaskType::Clustering => "clustering",
            TaskType::LearningCurve => "learning curve",
            TaskType::DatastreamClassification => "datastream classification",
            TaskType::SurvivalAnalysis => "survival analysis",
            TaskType::SubgroupDiscovery => "subgroup discovery",
            TaskType::MultitaskRegression => "multitask regression",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    /// Accepts the display form ("binary classification") as well as
    /// snake_case and dashed spellings, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        TaskType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown task type '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: DocumentId,
    pub task_type: TaskType,
    pub dataset_id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(default)]
    pub related_implementations: Vec<DocumentId>,
}
