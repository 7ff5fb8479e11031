//! Trained model documents

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{DocumentId, Metrics, Task};

/// A hyperparameter value as recorded by the training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Integer(v) => Some(*v as f64),
            ParameterValue::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Integer(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Text(v) => f.write_str(v),
            ParameterValue::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        Self { name: name.into(), value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    #[serde(default)]
    pub hyper_parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_string: Option<String>,
    pub implementation_id: DocumentId,
    pub task_id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: DocumentId,
    pub setup: Setup,
    #[serde(default)]
    pub metrics: Metrics,
}

/// A model joined with the task it was trained on
///
/// The resolver already holds every task of the selected tier, so the join
/// happens there and downstream stages never look tasks up again.
#[derive(Debug, Clone)]
pub struct CandidateModel {
    pub model: Arc<Model>,
    pub task: Arc<Task>,
}

impl CandidateModel {
    pub fn new(model: Arc<Model>, task: Arc<Task>) -> Self {
        Self { model, task }
    }

    pub fn id(&self) -> &DocumentId {
        &self.model.id
    }

    pub fn dataset_id(&self) -> &DocumentId {
        &self.task.dataset_id
    }

    pub fn implementation_id(&self) -> &DocumentId {
        &self.model.setup.implementation_id
    }

    pub fn metrics(&self) -> &Metrics {
        &self.model.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_value_untagged_forms() {
        let values: Vec<ParameterValue> =
            serde_json::from_str(r#"[true, 12, 0.5, "gini", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ParameterValue::Bool(true),
                ParameterValue::Integer(12),
                ParameterValue::Float(0.5),
                ParameterValue::Text("gini".into()),
                ParameterValue::Null,
            ]
        );
        assert_eq!(values[1].as_f64(), Some(12.0));
        assert_eq!(values[3].as_f64(), None);
    }
}
