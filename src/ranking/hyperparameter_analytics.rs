//! Hyperparameter analytics
//!
//! One instance per implementation. Every configuration added while the
//! report is populated contributes its numeric values; once fitted, the
//! per-parameter standardizers turn raw configurations into comparable
//! grouping keys. Fitting closes the instance to further additions.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::hyperparameter_configuration::{ConfigurationValue, HyperparameterConfiguration, RawConfiguration};
use crate::catalog::{Implementation, ParameterValue};
use crate::error::{RecommenderError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Standardizer {
    mean: f64,
    std: f64,
}

impl Standardizer {
    fn fit(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: variance.sqrt(),
        }
    }

    fn z_score(&self, value: f64) -> f64 {
        if self.std > 0.0 {
            (value - self.mean) / self.std
        } else {
            0.0
        }
    }
}

#[derive(Debug)]
pub struct HyperparameterAnalytics {
    implementation: Arc<Implementation>,
    resolution: f64,
    observed: BTreeMap<String, Vec<f64>>,
    standardizers: Option<BTreeMap<String, Standardizer>>,
}

impl HyperparameterAnalytics {
    pub fn new(implementation: Arc<Implementation>, resolution: f64) -> Self {
        Self {
            implementation,
            resolution,
            observed: BTreeMap::new(),
            standardizers: None,
        }
    }

    pub fn implementation(&self) -> &Arc<Implementation> {
        &self.implementation
    }

    pub fn add_configuration(&mut self, configuration: &RawConfiguration) -> Result<()> {
        if self.are_standardizers_fitted() {
            return Err(RecommenderError::ordering(format!(
                "configuration added to '{}' after standardizers were fitted",
                self.implementation.title
            )));
        }
        for (name, value) in configuration.iter() {
            if let Some(v) = value.as_f64() {
                self.observed.entry(name.clone()).or_default().push(v);
            }
        }
        Ok(())
    }

    pub fn fit_standardizers(&mut self) {
        let standardizers: BTreeMap<String, Standardizer> = self
            .observed
            .iter()
            .map(|(name, values)| (name.clone(), Standardizer::fit(values)))
            .collect();
        debug!(
            implementation = %self.implementation.id,
            parameters = standardizers.len(),
            "Fitted hyperparameter standardizers"
        );
        self.standardizers = Some(standardizers);
    }

    pub fn are_standardizers_fitted(&self) -> bool {
        self.standardizers.is_some()
    }

    pub fn standardize(&self, configuration: &RawConfiguration) -> Result<HyperparameterConfiguration> {
        let standardizers = self.standardizers.as_ref().ok_or_else(|| {
            RecommenderError::ordering(format!(
                "standardizers of '{}' are not fitted",
                self.implementation.title
            ))
        })?;

        configuration
            .iter()
            .map(|(name, value)| -> Result<(String, ConfigurationValue)> {
                let standardized = match value {
                    ParameterValue::Bool(b) => ConfigurationValue::Flag(*b),
                    ParameterValue::Text(s) => ConfigurationValue::Text(s.clone()),
                    ParameterValue::Null => ConfigurationValue::Missing,
                    numeric => match numeric.as_f64() {
                        Some(v) => {
                            let standardizer = standardizers.get(name).ok_or_else(|| {
                                RecommenderError::ordering(format!("parameter '{}' was never registered", name))
                            })?;
                            let z = standardizer.z_score(v);
                            ConfigurationValue::Quantized((z / self.resolution).round() as i64)
                        }
                        // non-finite floats
                        None => ConfigurationValue::Missing,
                    },
                };
                Ok((name.clone(), standardized))
            })
            .collect()
    }
}
