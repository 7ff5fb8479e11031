//! Direction-aware min-max normalizer
//!
//! `transform` maps a raw metric value to its distance from the best value
//! observed: 0.0 is optimal, 1.0 is the worst.

use serde::{Deserialize, Serialize};

use crate::catalog::OptimizationDirection;
use crate::error::{RecommenderError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    direction: OptimizationDirection,
    /// (min, max) once fitted.
    range: Option<(f64, f64)>,
}

impl Normalizer {
    pub fn new(direction: OptimizationDirection) -> Self {
        Self { direction, range: None }
    }

    pub fn direction(&self) -> OptimizationDirection {
        self.direction
    }

    pub fn is_fitted(&self) -> bool {
        self.range.is_some()
    }

    pub fn fit(&mut self, values: &[f64]) -> Result<&mut Self> {
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if min > max {
            return Err(RecommenderError::validation("normalizer needs at least one finite value to fit"));
        }
        self.range = Some((min, max));
        Ok(self)
    }

    pub fn transform(&self, value: f64) -> Result<f64> {
        let (min, max) = self
            .range
            .ok_or_else(|| RecommenderError::ordering("normalizer used before fit"))?;
        // degenerate range: every value sits at the worst distance and adds nothing to scores
        if min == max {
            return Ok(1.0);
        }
        let scaled = (value - min) / (max - min);
        let distance = match self.direction {
            OptimizationDirection::Minimize => scaled,
            OptimizationDirection::Maximize => 1.0 - scaled,
        };
        Ok(distance.clamp(0.0, 1.0))
    }
}
