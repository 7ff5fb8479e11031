//! Dataset documents
//!
//! A dataset is profiled once at ingestion time: descriptive info with the
//! per-type feature ratios, plus per-feature analytics keyed by feature name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFeatureType {
    Binary,
    Multiclass,
    Regression,
}

/// The four feature types a dataset's columns are split into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Numeric,
    Categorical,
    Datetime,
    Unstructured,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::Numeric,
        DataType::Categorical,
        DataType::Datetime,
        DataType::Unstructured,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub dataset_name: String,
    #[serde(default)]
    pub target_label: String,
    pub target_feature_type: TargetFeatureType,
    pub observations: u64,
    #[serde(default)]
    pub analyzed_observations: u64,
    pub features: u32,
    pub numeric_ratio: f64,
    pub categorical_ratio: f64,
    pub datetime_ratio: f64,
    pub unstructured_ratio: f64,
    #[serde(default)]
    pub analyzed_features: Vec<String>,
    #[serde(default)]
    pub discarded_features: Vec<String>,
    #[serde(default)]
    pub analysis_time: f64,
}

impl DatasetInfo {
    pub fn ratio(&self, data_type: DataType) -> f64 {
        match data_type {
            DataType::Numeric => self.numeric_ratio,
            DataType::Categorical => self.categorical_ratio,
            DataType::Datetime => self.datetime_ratio,
            DataType::Unstructured => self.unstructured_ratio,
        }
    }

    pub fn ratios(&self) -> [f64; 4] {
        DataType::ALL.map(|t| self.ratio(t))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantiles {
    pub q0: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
    pub iqr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outliers {
    pub number: u64,
    #[serde(default)]
    pub actual_values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub normal: bool,
    pub exponential: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericalFeature {
    pub monotonous_filtering: f64,
    #[serde(default)]
    pub anova_f1: f64,
    #[serde(default)]
    pub anova_pvalue: f64,
    /// Absent for regression targets.
    #[serde(default)]
    pub mutual_info: Option<f64>,
    #[serde(default)]
    pub missing_values: u64,
    #[serde(default)]
    pub min_orderm: f64,
    #[serde(default)]
    pub max_orderm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quartiles: Option<Quantiles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outliers: Option<Outliers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
}

impl NumericalFeature {
    pub fn new(monotonous_filtering: f64, mutual_info: Option<f64>) -> Self {
        Self {
            monotonous_filtering,
            anova_f1: 0.0,
            anova_pvalue: 0.0,
            mutual_info,
            missing_values: 0,
            min_orderm: 0.0,
            max_orderm: 0.0,
            quartiles: None,
            outliers: None,
            distribution: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFeature {
    #[serde(default)]
    pub missing_values: u64,
    #[serde(default)]
    pub nr_levels: u32,
    #[serde(default)]
    pub levels: BTreeMap<String, String>,
    #[serde(default)]
    pub imbalance: f64,
    #[serde(default)]
    pub mutual_info: Option<f64>,
    pub monotonous_filtering: f64,
}

impl CategoricalFeature {
    pub fn new(monotonous_filtering: f64, mutual_info: Option<f64>) -> Self {
        Self {
            missing_values: 0,
            nr_levels: 0,
            levels: BTreeMap::new(),
            imbalance: 0.0,
            mutual_info,
            monotonous_filtering,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnstructuredFeature {
    pub missing_values: u64,
    pub vocab_size: u64,
    pub relative_vocab: f64,
    pub vocab_concentration: f64,
    pub entropy: f64,
    pub min_vocab: u64,
    pub max_vocab: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatetimeFeature {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    #[serde(default)]
    pub numerical_features: BTreeMap<String, NumericalFeature>,
    #[serde(default)]
    pub categorical_features: BTreeMap<String, CategoricalFeature>,
    #[serde(default)]
    pub unstructured_features: BTreeMap<String, UnstructuredFeature>,
    #[serde(default)]
    pub datetime_features: BTreeMap<String, DatetimeFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DocumentId,
    pub info: DatasetInfo,
    #[serde(default)]
    pub features: Features,
}

impl Dataset {
    /// Symmetric similarity of two datasets' descriptive info, in [0, 1].
    ///
    /// Weighs the data-type ratio profile (0.4), the observation count (0.2),
    /// the feature count (0.2) and the target type (0.2). Identical info
    /// scores 1.0.
    pub fn similarity(&self, other: &Dataset) -> f64 {
        let a = &self.info;
        let b = &other.info;

        let l1: f64 = a
            .ratios()
            .iter()
            .zip(b.ratios().iter())
            .map(|(x, y)| (x - y).abs())
            .sum();
        let ratio_similarity = (1.0 - l1 / 2.0).clamp(0.0, 1.0);
        let size_similarity = count_ratio(a.observations as f64, b.observations as f64);
        let width_similarity = count_ratio(a.features as f64, b.features as f64);
        let target_similarity = if a.target_feature_type == b.target_feature_type { 1.0 } else { 0.0 };

        0.4 * ratio_similarity + 0.2 * size_similarity + 0.2 * width_similarity + 0.2 * target_similarity
    }
}

fn count_ratio(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if hi <= 0.0 {
        return 1.0;
    }
    a.min(b) / hi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, ratios: [f64; 4], observations: u64, features: u32) -> DatasetInfo {
        DatasetInfo {
            dataset_name: name.to_string(),
            target_label: "class".to_string(),
            target_feature_type: TargetFeatureType::Binary,
            observations,
            analyzed_observations: observations,
            features,
            numeric_ratio: ratios[0],
            categorical_ratio: ratios[1],
            datetime_ratio: ratios[2],
            unstructured_ratio: ratios[3],
            analyzed_features: Vec::new(),
            discarded_features: Vec::new(),
            analysis_time: 0.0,
        }
    }

    fn dataset(id: &str, ratios: [f64; 4], observations: u64, features: u32) -> Dataset {
        Dataset {
            id: DocumentId::new(id),
            info: info(id, ratios, observations, features),
            features: Features::default(),
        }
    }

    #[test]
    fn test_similarity_identical_is_one() {
        let d = dataset("a", [0.5, 0.5, 0.0, 0.0], 1000, 10);
        assert!((d.similarity(&d) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = dataset("a", [0.7, 0.3, 0.0, 0.0], 1000, 10);
        let mut b = dataset("b", [0.2, 0.5, 0.3, 0.0], 250, 40);
        b.info.target_feature_type = TargetFeatureType::Multiclass;
        assert_eq!(a.similarity(&b), b.similarity(&a));
        assert!(a.similarity(&b) < 0.6);
    }

    #[test]
    fn test_closer_ratios_score_higher() {
        let target = dataset("t", [0.6, 0.4, 0.0, 0.0], 500, 20);
        let near = dataset("n", [0.62, 0.38, 0.0, 0.0], 500, 20);
        let far = dataset("f", [0.1, 0.9, 0.0, 0.0], 500, 20);
        assert!(target.similarity(&near) > target.similarity(&far));
    }

    #[test]
    fn test_ratios_follow_data_type_order() {
        let d = dataset("a", [0.1, 0.2, 0.3, 0.4], 1, 1);
        assert_eq!(d.info.ratios(), [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(d.info.ratio(DataType::Datetime), 0.3);
    }
}
