//! Implementation documents

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{DocumentId, ParameterValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Software {
    pub name: String,
    pub version: String,
}

/// Declared hyperparameter of an implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ParameterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub dependencies: Vec<Software>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Implementation {
    pub fn default_value(&self, parameter: &str) -> Option<&ParameterValue> {
        self.parameters.get(parameter).and_then(|p| p.default_value.as_ref())
    }
}
