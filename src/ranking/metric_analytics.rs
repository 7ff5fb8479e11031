//! Metric analytics
//!
//! Collects every metric value seen while a report is populated, fits one
//! normalizer per metric over all of them, and aggregates metric collections
//! into per-metric summaries. Summaries carry both raw statistics and
//! quality statistics (1.0 = best value observed) so metrics with different
//! scales and directions can be combined into one score.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::normalizer::Normalizer;
use crate::catalog::{Metric, Metrics};
use crate::error::{RecommenderError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub quality_mean: f64,
    pub quality_std: f64,
}

pub type AggregatedMetrics = BTreeMap<Metric, MetricSummary>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    pub mean: f64,
    pub std: f64,
}

impl ScoreVector {
    /// `mean - lambda * std`
    pub fn penalized(&self, lambda: f64) -> f64 {
        self.mean - lambda * self.std
    }
}

/// Equal ranking weight for every selected metric.
pub fn uniform_weights(metrics: &[Metric]) -> BTreeMap<Metric, f64> {
    metrics.iter().map(|m| (*m, 1.0)).collect()
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[derive(Debug, Default)]
pub struct MetricAnalytics {
    observed: BTreeMap<Metric, Vec<f64>>,
    normalizers: Option<BTreeMap<Metric, Normalizer>>,
}

impl MetricAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.normalizers.is_some()
    }

    /// Record the numeric metric values of one model.
    pub fn add_metric_values(&mut self, metrics: &Metrics) -> Result<()> {
        if self.is_fitted() {
            return Err(RecommenderError::ordering("metric values added after normalizers were fitted"));
        }
        for (metric, value) in metrics.iter() {
            if let Some(v) = metric.is_numeric().then(|| value.as_f64()).flatten() {
                self.observed.entry(*metric).or_default().push(v);
            }
        }
        Ok(())
    }

    pub fn fit_normalizers(&mut self) -> Result<()> {
        let mut normalizers = BTreeMap::new();
        for (metric, values) in &self.observed {
            let mut normalizer = Normalizer::new(metric.direction());
            normalizer.fit(values)?;
            normalizers.insert(*metric, normalizer);
        }
        debug!(metrics = normalizers.len(), "Fitted metric normalizers");
        self.normalizers = Some(normalizers);
        Ok(())
    }

    /// Quality of a raw value: 1.0 for the best value observed, 0.0 for the
    /// worst.
    pub fn quality(&self, metric: Metric, value: f64) -> Result<f64> {
        let normalizers = self
            .normalizers
            .as_ref()
            .ok_or_else(|| RecommenderError::ordering("metric analytics used before normalizers were fitted"))?;
        let normalizer = normalizers
            .get(&metric)
            .ok_or_else(|| RecommenderError::ordering(format!("no values were registered for metric '{}'", metric)))?;
        Ok(1.0 - normalizer.transform(value)?)
    }

    /// Summarize the numeric metrics of a list of models.
    pub fn aggregate_list<'a, I>(&self, models: I) -> Result<AggregatedMetrics>
    where
        I: IntoIterator<Item = &'a Metrics>,
    {
        let mut columns: BTreeMap<Metric, Vec<f64>> = BTreeMap::new();
        for metrics in models {
            for (metric, value) in metrics.iter() {
                if let Some(v) = metric.is_numeric().then(|| value.as_f64()).flatten() {
                    columns.entry(*metric).or_default().push(v);
                }
            }
        }

        let mut aggregated = AggregatedMetrics::new();
        for (metric, values) in columns {
            let qualities = values
                .iter()
                .map(|v| self.quality(metric, *v))
                .collect::<Result<Vec<_>>>()?;
            let (mean, std) = mean_std(&values);
            let (quality_mean, quality_std) = mean_std(&qualities);
            aggregated.insert(
                metric,
                MetricSummary {
                    count: values.len(),
                    mean,
                    std,
                    min: values.iter().copied().fold(f64::INFINITY, f64::min),
                    max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    quality_mean,
                    quality_std,
                },
            );
        }
        Ok(aggregated)
    }

    /// Combine summaries of several groups, weighting each group.
    ///
    /// Means are weighted averages; deviations are pooled (within-group
    /// variance plus the spread of the group means). All-zero weights fall
    /// back to equal weights.
    pub fn aggregate_weighted(&self, groups: &[(f64, &AggregatedMetrics)]) -> AggregatedMetrics {
        let uniform = groups.iter().all(|(w, _)| *w <= 0.0);
        let weight = |w: f64| if uniform { 1.0 } else { w.max(0.0) };

        let metrics: Vec<Metric> = {
            let mut all: Vec<Metric> = groups.iter().flat_map(|(_, g)| g.keys().copied()).collect();
            all.sort();
            all.dedup();
            all
        };

        let mut aggregated = AggregatedMetrics::new();
        for metric in metrics {
            let parts: Vec<(f64, &MetricSummary)> = groups
                .iter()
                .filter_map(|(w, g)| g.get(&metric).map(|s| (weight(*w), s)))
                .collect();
            let mut total: f64 = parts.iter().map(|(w, _)| w).sum();
            let parts: Vec<(f64, &MetricSummary)> = if total > 0.0 {
                parts
            } else {
                total = parts.len() as f64;
                parts.into_iter().map(|(_, s)| (1.0, s)).collect()
            };

            let pooled = |mean_of: fn(&MetricSummary) -> f64, std_of: fn(&MetricSummary) -> f64| {
                let mean = parts.iter().map(|(w, s)| w * mean_of(s)).sum::<f64>() / total;
                let variance = parts
                    .iter()
                    .map(|(w, s)| w * (std_of(s).powi(2) + (mean_of(s) - mean).powi(2)))
                    .sum::<f64>()
                    / total;
                (mean, variance.max(0.0).sqrt())
            };
            let (mean, std) = pooled(|s| s.mean, |s| s.std);
            let (quality_mean, quality_std) = pooled(|s| s.quality_mean, |s| s.quality_std);

            aggregated.insert(
                metric,
                MetricSummary {
                    count: parts.iter().map(|(_, s)| s.count).sum(),
                    mean,
                    std,
                    min: parts.iter().map(|(_, s)| s.min).fold(f64::INFINITY, f64::min),
                    max: parts.iter().map(|(_, s)| s.max).fold(f64::NEG_INFINITY, f64::max),
                    quality_mean,
                    quality_std,
                },
            );
        }
        aggregated
    }

    /// Weighted mean of the per-metric quality means and deviations.
    ///
    /// A weighted metric missing from `aggregated` counts as quality 0.
    pub fn calculate_overall_score(&self, aggregated: &AggregatedMetrics, weights: &BTreeMap<Metric, f64>) -> ScoreVector {
        let total: f64 = weights.values().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return ScoreVector { mean: 0.0, std: 0.0 };
        }
        let (mut mean, mut std) = (0.0, 0.0);
        for (metric, w) in weights.iter().filter(|(_, w)| **w > 0.0) {
            if let Some(summary) = aggregated.get(metric) {
                mean += w * summary.quality_mean;
                std += w * summary.quality_std;
            }
        }
        ScoreVector {
            mean: mean / total,
            std: std / total,
        }
    }
}
