//! Acceptability classification
//!
//! Candidates are clustered in the normalized space of the selected metrics.
//! Each cluster is then scored by how many of its members fall inside the
//! acceptable band of every metric; clusters where a majority do form the
//! acceptable group. Clusters that miss it are scored again against the
//! next, twice as wide band to form the nearly acceptable group.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::dbscan::Dbscan;
use crate::catalog::{CandidateModel, Metric, OptimizationDirection};
use crate::config::ClusteringSettings;
use crate::error::Result;
use crate::query::Preferences;
use crate::ranking::Normalizer;

/// Distrust points produced by classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptabilityDistrust {
    /// Selected metrics that no candidate reports.
    pub metrics_support: u32,
    pub acceptable: u32,
    pub nearly_acceptable: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterFit {
    pub label: i32,
    pub size: usize,
    pub acceptable_fit: f64,
    /// Only computed for clusters that are not acceptable.
    pub nearly_acceptable_fit: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Acceptability {
    pub acceptable: Vec<CandidateModel>,
    pub nearly_acceptable: Vec<CandidateModel>,
    pub distrust: AcceptabilityDistrust,
    pub clusters: Vec<ClusterFit>,
}

/// Acceptable and nearly acceptable bands of one metric
#[derive(Debug, Clone, Copy)]
struct Band {
    direction: OptimizationDirection,
    acceptable_limit: f64,
    nearly_limit: f64,
}

impl Band {
    fn new(direction: OptimizationDirection, values: &[f64], width: f64) -> Option<Self> {
        let best = match direction {
            OptimizationDirection::Maximize => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            OptimizationDirection::Minimize => values.iter().copied().fold(f64::INFINITY, f64::min),
        };
        if !best.is_finite() {
            return None;
        }
        let step = best.abs() * width;
        let (acceptable_limit, nearly_limit) = match direction {
            OptimizationDirection::Maximize => (best - step, best - 2.0 * step),
            OptimizationDirection::Minimize => (best + step, best + 2.0 * step),
        };
        Some(Self {
            direction,
            acceptable_limit,
            nearly_limit,
        })
    }

    fn is_acceptable(&self, value: f64) -> bool {
        match self.direction {
            OptimizationDirection::Maximize => value >= self.acceptable_limit,
            OptimizationDirection::Minimize => value <= self.acceptable_limit,
        }
    }

    fn is_nearly_acceptable(&self, value: f64) -> bool {
        match self.direction {
            OptimizationDirection::Maximize => value >= self.nearly_limit && value < self.acceptable_limit,
            OptimizationDirection::Minimize => value <= self.nearly_limit && value > self.acceptable_limit,
        }
    }
}

/// Points for one region from the fits of the clusters selected into it.
fn region_distrust(selected_fits: &[f64]) -> u32 {
    if selected_fits.is_empty() {
        return 3;
    }
    let inside = selected_fits.iter().filter(|f| **f == 1.0).count() as f64 / selected_fits.len() as f64;
    if inside == 1.0 {
        0
    } else if inside >= 0.5 {
        1
    } else if inside > 0.0 {
        2
    } else {
        3
    }
}

pub struct AcceptabilityClassifier {
    settings: ClusteringSettings,
}

impl AcceptabilityClassifier {
    pub fn new(settings: ClusteringSettings) -> Self {
        Self { settings }
    }

    pub fn classify(&self, candidates: &[CandidateModel], preferences: &Preferences) -> Result<Acceptability> {
        let mut supported: Vec<(Metric, f64, Vec<Option<f64>>)> = Vec::new();
        let mut metrics_support = 0;
        for (metric, width) in preferences.selected() {
            let column: Vec<Option<f64>> = candidates.iter().map(|c| c.metrics().numeric(metric)).collect();
            if column.iter().all(Option::is_none) {
                info!(metric = %metric, "No candidate reports this metric, boundary not applied");
                metrics_support += 1;
            } else {
                supported.push((metric, width, column));
            }
        }

        if candidates.is_empty() || supported.is_empty() {
            info!("No metric space to cluster candidates in");
            return Ok(Acceptability {
                distrust: AcceptabilityDistrust {
                    metrics_support,
                    acceptable: region_distrust(&[]),
                    nearly_acceptable: 0,
                },
                ..Acceptability::default()
            });
        }

        let mut points = vec![Vec::with_capacity(supported.len()); candidates.len()];
        let mut bands = Vec::with_capacity(supported.len());
        for (metric, width, column) in &supported {
            let observed: Vec<f64> = column.iter().flatten().copied().collect();
            let mut normalizer = Normalizer::new(metric.direction());
            normalizer.fit(&observed)?;
            for (point, value) in points.iter_mut().zip(column) {
                let distance = match value {
                    Some(v) => normalizer.transform(*v)?,
                    None => 1.0,
                };
                point.push(distance);
            }
            bands.push(Band::new(metric.direction(), &observed, *width));
        }

        let mut dbscan = Dbscan::new(self.settings.eps, self.settings.min_samples);
        dbscan.fit(&points)?;
        let labels = dbscan.labels().unwrap_or_default();

        let mut members: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, label) in labels.iter().enumerate() {
            if *label >= 0 {
                members.entry(*label).or_default().push(i);
            }
        }
        debug!(clusters = members.len(), noise = labels.iter().filter(|l| **l < 0).count(), "Clustered candidates");

        let fit_of = |indices: &[usize], in_band: &dyn Fn(&Band, f64) -> bool| -> f64 {
            let per_metric: Vec<f64> = supported
                .iter()
                .zip(&bands)
                .map(|((_, _, column), band)| {
                    let Some(band) = band else { return 0.0 };
                    let inside = indices
                        .iter()
                        .filter(|i| column[**i].map(|v| in_band(band, v)).unwrap_or(false))
                        .count();
                    inside as f64 / indices.len() as f64
                })
                .collect();
            per_metric.iter().sum::<f64>() / per_metric.len() as f64
        };

        let mut clusters = Vec::with_capacity(members.len());
        let mut acceptable_labels = Vec::new();
        let mut nearly_labels = Vec::new();
        for (label, indices) in &members {
            let acceptable_fit = fit_of(indices, &|band: &Band, v: f64| band.is_acceptable(v));
            info!(cluster = label, "Cluster is {:.2}% inside the acceptable region", acceptable_fit * 100.0);

            let mut fit = ClusterFit {
                label: *label,
                size: indices.len(),
                acceptable_fit,
                nearly_acceptable_fit: None,
            };
            if acceptable_fit > self.settings.majority_ratio {
                acceptable_labels.push((*label, acceptable_fit));
            } else {
                let nearly_fit = fit_of(indices, &|band: &Band, v: f64| band.is_nearly_acceptable(v));
                info!(cluster = label, "Cluster is {:.2}% inside the nearly acceptable region", nearly_fit * 100.0);
                fit.nearly_acceptable_fit = Some(nearly_fit);
                if nearly_fit > self.settings.majority_ratio {
                    nearly_labels.push((*label, nearly_fit));
                }
            }
            clusters.push(fit);
        }

        let acceptable_fits: Vec<f64> = acceptable_labels.iter().map(|(_, f)| *f).collect();
        let nearly_fits: Vec<f64> = nearly_labels.iter().map(|(_, f)| *f).collect();
        let distrust = AcceptabilityDistrust {
            metrics_support,
            acceptable: region_distrust(&acceptable_fits),
            nearly_acceptable: if nearly_fits.is_empty() { 0 } else { region_distrust(&nearly_fits) },
        };
        info!(
            acceptable_distrust = distrust.acceptable,
            nearly_acceptable_distrust = distrust.nearly_acceptable,
            metrics_support = distrust.metrics_support,
            "Distrust points from acceptability clustering"
        );

        let pick = |selected: &[(i32, f64)]| -> Vec<CandidateModel> {
            candidates
                .iter()
                .zip(labels)
                .filter(|(_, label)| selected.iter().any(|(l, _)| l == *label))
                .map(|(c, _)| c.clone())
                .collect()
        };

        Ok(Acceptability {
            acceptable: pick(&acceptable_labels),
            nearly_acceptable: pick(&nearly_labels),
            distrust,
            clusters,
        })
    }
}
