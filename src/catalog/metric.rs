//! Supported evaluation metrics
//!
//! A closed enumeration: every metric carries its value type and optimization
//! direction statically, so a metrics map is validated once when it is
//! deserialized and never re-checked downstream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    AreaUnderCurve,
    AverageCost,
    FMeasure,
    Kappa,
    KononenkoBrankoRelativeInformationScore,
    MeanAbsoluteError,
    MeanPriorAbsoluteError,
    Precision,
    Accuracy,
    PriorEntropy,
    Recall,
    RelativeAbsoluteError,
    RootMeanPriorSquaredError,
    RootMeanSquaredError,
    RootRelativeSquaredError,
    TotalCost,
    TrainingTime,
    ConfusionMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValueType {
    Float,
    Text,
}

impl MetricValueType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, MetricValueType::Float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationDirection {
    Minimize,
    Maximize,
}

impl Metric {
    pub const ALL: [Metric; 18] = [
        Metric::AreaUnderCurve,
        Metric::AverageCost,
        Metric::FMeasure,
        Metric::Kappa,
        Metric::KononenkoBrankoRelativeInformationScore,
        Metric::MeanAbsoluteError,
        Metric::MeanPriorAbsoluteError,
        Metric::Precision,
        Metric::Accuracy,
        Metric::PriorEntropy,
        Metric::Recall,
        Metric::RelativeAbsoluteError,
        Metric::RootMeanPriorSquaredError,
        Metric::RootMeanSquaredError,
        Metric::RootRelativeSquaredError,
        Metric::TotalCost,
        Metric::TrainingTime,
        Metric::ConfusionMatrix,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::AreaUnderCurve => "area_under_curve",
            Metric::AverageCost => "average_cost",
            Metric::FMeasure => "f_measure",
            Metric::Kappa => "kappa",
            Metric::KononenkoBrankoRelativeInformationScore => "kononenko_branko_relative_information_score",
            Metric::MeanAbsoluteError => "mean_absolute_error",
            Metric::MeanPriorAbsoluteError => "mean_prior_absolute_error",
            Metric::Precision => "precision",
            Metric::Accuracy => "accuracy",
            Metric::PriorEntropy => "prior_entropy",
            Metric::Recall => "recall",
            Metric::RelativeAbsoluteError => "relative_absolute_error",
            Metric::RootMeanPriorSquaredError => "root_mean_prior_squared_error",
            Metric::RootMeanSquaredError => "root_mean_squared_error",
            Metric::RootRelativeSquaredError => "root_relative_squared_error",
            Metric::TotalCost => "total_cost",
            Metric::TrainingTime => "training_time",
            Metric::ConfusionMatrix => "confusion_matrix",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::AreaUnderCurve => "Area under curve",
            Metric::AverageCost => "Average cost",
            Metric::FMeasure => "F-measure",
            Metric::Kappa => "Kappa",
            Metric::KononenkoBrankoRelativeInformationScore => "Kononenko Branko relative information score",
            Metric::MeanAbsoluteError => "Mean absolute error",
            Metric::MeanPriorAbsoluteError => "Mean prior absolute error",
            Metric::Precision => "Precision",
            Metric::Accuracy => "Accuracy",
            Metric::PriorEntropy => "Prior entropy",
            Metric::Recall => "Recall",
            Metric::RelativeAbsoluteError => "Relative absolute error",
            Metric::RootMeanPriorSquaredError => "Root mean prior squared error",
            Metric::RootMeanSquaredError => "Root mean squared error",
            Metric::RootRelativeSquaredError => "Root relative squared error",
            Metric::TotalCost => "Total cost",
            Metric::TrainingTime => "Training time",
            Metric::ConfusionMatrix => "Confusion matrix",
        }
    }

    pub fn value_type(&self) -> MetricValueType {
        match self {
            Metric::ConfusionMatrix => MetricValueType::Text,
            _ => MetricValueType::Float,
        }
    }

    pub fn direction(&self) -> OptimizationDirection {
        match self {
            Metric::AverageCost
            | Metric::MeanAbsoluteError
            | Metric::MeanPriorAbsoluteError
            | Metric::RelativeAbsoluteError
            | Metric::RootMeanPriorSquaredError
            | Metric::RootMeanSquaredError
            | Metric::RootRelativeSquaredError
            | Metric::TotalCost
            | Metric::TrainingTime => OptimizationDirection::Minimize,
            _ => OptimizationDirection::Maximize,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.value_type().is_numeric()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.key() == s)
            .ok_or_else(|| format!("'{}' is not a supported metric", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

/// Metric values of one trained model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<Metric, MetricValue>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.0.insert(metric, MetricValue::Number(value));
        self
    }

    pub fn insert(&mut self, metric: Metric, value: MetricValue) {
        self.0.insert(metric, value);
    }

    pub fn get(&self, metric: Metric) -> Option<&MetricValue> {
        self.0.get(&metric)
    }

    /// The metric as a finite number, if the model reports one.
    pub fn numeric(&self, metric: Metric) -> Option<f64> {
        if !metric.is_numeric() {
            return None;
        }
        self.0.get(&metric).and_then(MetricValue::as_f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Metric, &MetricValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Metric, f64)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (Metric, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(m, v)| (m, MetricValue::Number(v))).collect())
    }
}
