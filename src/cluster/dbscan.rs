//! DBSCAN (Density-Based Spatial Clustering of Applications with Noise)
//!
//! Labels are -1 for noise and 0, 1, 2, ... for clusters. Border points
//! first seen as noise are absorbed by the cluster that reaches them.

use serde::{Deserialize, Serialize};

use crate::error::{RecommenderError, Result};

const UNVISITED: i32 = -2;
pub const NOISE: i32 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dbscan {
    /// Maximum distance between two samples to be neighbors.
    eps: f64,
    /// Minimum neighborhood size (the point included) of a core point.
    min_samples: usize,
    labels: Option<Vec<i32>>,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples,
            labels: None,
        }
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    pub fn is_fitted(&self) -> bool {
        self.labels.is_some()
    }

    /// Cluster labels, one per fitted point. `None` before `fit`.
    pub fn labels(&self) -> Option<&[i32]> {
        self.labels.as_deref()
    }

    pub fn n_clusters(&self) -> usize {
        self.labels
            .as_ref()
            .and_then(|l| l.iter().copied().max())
            .map(|max| (max + 1).max(0) as usize)
            .unwrap_or(0)
    }

    pub fn fit(&mut self, points: &[Vec<f64>]) -> Result<()> {
        if let Some(first) = points.first() {
            if points.iter().any(|p| p.len() != first.len()) {
                return Err(RecommenderError::validation("DBSCAN points must share one dimension"));
            }
        }

        let mut labels = vec![UNVISITED; points.len()];
        let mut cluster_id = 0;

        for i in 0..points.len() {
            if labels[i] != UNVISITED {
                continue;
            }

            let mut neighbors = self.region_query(points, i);
            if neighbors.len() < self.min_samples {
                labels[i] = NOISE;
                continue;
            }

            self.expand_cluster(points, &mut labels, i, &mut neighbors, cluster_id);
            cluster_id += 1;
        }

        self.labels = Some(labels);
        Ok(())
    }

    fn region_query(&self, points: &[Vec<f64>], i: usize) -> Vec<usize> {
        (0..points.len())
            .filter(|&j| euclidean_distance(&points[i], &points[j]) <= self.eps)
            .collect()
    }

    fn expand_cluster(
        &self,
        points: &[Vec<f64>],
        labels: &mut [i32],
        point: usize,
        neighbors: &mut Vec<usize>,
        cluster_id: i32,
    ) {
        labels[point] = cluster_id;

        let mut i = 0;
        while i < neighbors.len() {
            let neighbor = neighbors[i];

            if labels[neighbor] == UNVISITED {
                labels[neighbor] = cluster_id;

                let neighbor_neighbors = self.region_query(points, neighbor);
                if neighbor_neighbors.len() >= self.min_samples {
                    for nn in neighbor_neighbors {
                        if !neighbors.contains(&nn) {
                            neighbors.push(nn);
                        }
                    }
                }
            } else if labels[neighbor] == NOISE {
                labels[neighbor] = cluster_id;
            }

            i += 1;
        }
    }
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_clusters_and_noise() {
        let points = vec![
            vec![1.0, 1.0],
            vec![1.2, 1.1],
            vec![1.1, 1.2],
            vec![5.0, 5.0],
            vec![5.1, 5.2],
            vec![5.2, 5.1],
            vec![10.0, 10.0],
        ];
        let mut dbscan = Dbscan::new(0.5, 2);
        dbscan.fit(&points).unwrap();

        let labels = dbscan.labels().unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
        assert_eq!(labels[6], NOISE);
        assert_eq!(dbscan.n_clusters(), 2);
    }

    #[test]
    fn test_border_point_joins_cluster() {
        // the last point has a single neighbor, but that neighbor is core
        let points = vec![vec![0.0], vec![0.1], vec![0.2], vec![0.3]];
        let mut dbscan = Dbscan::new(0.1 + 1e-9, 3);
        dbscan.fit(&points).unwrap();
        assert_eq!(dbscan.labels().unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_sparse_points_are_all_noise() {
        let points = vec![vec![0.0], vec![1.0], vec![2.0]];
        let mut dbscan = Dbscan::new(0.05, 3);
        dbscan.fit(&points).unwrap();
        assert!(dbscan.labels().unwrap().iter().all(|&l| l == NOISE));
        assert_eq!(dbscan.n_clusters(), 0);
    }

    #[test]
    fn test_unfitted_and_ragged_input() {
        let mut dbscan = Dbscan::new(0.5, 1);
        assert!(!dbscan.is_fitted());
        assert!(dbscan.labels().is_none());
        assert!(dbscan.fit(&[vec![0.0, 1.0], vec![0.0]]).is_err());
    }
}
