//! Hyperparameter configurations
//!
//! A `RawConfiguration` is what a model was trained with, completed from the
//! implementation's declared defaults. A `HyperparameterConfiguration` is its
//! standardized, hashable form: numeric values are replaced by quantized
//! z-scores so nearby settings share one grouping key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::{Implementation, ParameterValue, Setup};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawConfiguration(BTreeMap<String, ParameterValue>);

impl RawConfiguration {
    /// The setup's values, with every declared parameter the setup omits
    /// filled from its default.
    pub fn from_setup(setup: &Setup, implementation: &Implementation) -> Self {
        let mut values: BTreeMap<String, ParameterValue> = setup
            .hyper_parameters
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        for (name, spec) in &implementation.parameters {
            if let Some(default) = &spec.default_value {
                values.entry(name.clone()).or_insert_with(|| default.clone());
            }
        }
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ParameterValue)> for RawConfiguration {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigurationValue {
    /// Z-score divided by the grouping resolution, rounded.
    Quantized(i64),
    Flag(bool),
    Text(String),
    Missing,
}

impl fmt::Display for ConfigurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationValue::Quantized(q) => write!(f, "~{}", q),
            ConfigurationValue::Flag(b) => write!(f, "{}", b),
            ConfigurationValue::Text(s) => f.write_str(s),
            ConfigurationValue::Missing => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HyperparameterConfiguration(BTreeMap<String, ConfigurationValue>);

impl HyperparameterConfiguration {
    pub fn insert(&mut self, name: impl Into<String>, value: ConfigurationValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ConfigurationValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First 16 hex chars of the SHA-256 of the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(&self.0).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        let mut fingerprint = hex::encode(digest);
        fingerprint.truncate(16);
        fingerprint
    }
}

impl fmt::Display for HyperparameterConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl FromIterator<(String, ConfigurationValue)> for HyperparameterConfiguration {
    fn from_iter<I: IntoIterator<Item = (String, ConfigurationValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
