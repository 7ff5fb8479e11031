//! Recommender Configuration
//!
//! Defaults match the thresholds the recommender was calibrated with. A YAML
//! file named by `ASSISTML_CONFIG` replaces them section by section, and
//! `ASSISTML_*` variables override single values on top of that.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{RecommenderError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    /// Absolute band around each nonzero data-type ratio (tier 2).
    pub feature_ratio_tolerance: f64,
    pub monotonous_filtering_tolerance: f64,
    pub mutual_info_tolerance: f64,
    /// Share of target features that need a match for tier 3.
    pub similarity_ratio_threshold: f64,
    pub batch_size: usize,
    pub max_models: usize,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            feature_ratio_tolerance: 0.05,
            monotonous_filtering_tolerance: 0.05,
            mutual_info_tolerance: 0.02,
            similarity_ratio_threshold: 0.5,
            batch_size: 500,
            max_models: 50_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSettings {
    pub eps: f64,
    pub min_samples: usize,
    pub majority_ratio: f64,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            eps: 0.05,
            min_samples: 3,
            majority_ratio: 0.51,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    /// Weight of the standard deviation penalty in the overall score.
    pub lambda_penalty: f64,
    /// Hyperparameters closer than this many standard deviations share a
    /// configuration.
    pub hyperparameter_resolution: f64,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            lambda_penalty: 0.5,
            hyperparameter_resolution: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub top_k: usize,
    pub top_n: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self { top_k: 5, top_n: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 50,
            max_backoff_ms: 2000,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub selection: SelectionSettings,
    pub clustering: ClusteringSettings,
    pub ranking: RankingSettings,
    pub report: ReportSettings,
    pub retry: RetrySettings,
}

impl RecommenderConfig {
    /// Load `.env`, the optional YAML file, then single-value overrides.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match env::var("ASSISTML_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RecommenderError::validation(format!("cannot read config {:?}: {}", path, e)))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| RecommenderError::validation(format!("invalid config: {}", e)))
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        override_from_env("ASSISTML_TOP_K", &mut self.report.top_k)?;
        override_from_env("ASSISTML_TOP_N", &mut self.report.top_n)?;
        override_from_env("ASSISTML_LAMBDA", &mut self.ranking.lambda_penalty)?;
        override_from_env("ASSISTML_EPS", &mut self.clustering.eps)?;
        override_from_env("ASSISTML_MIN_SAMPLES", &mut self.clustering.min_samples)?;
        override_from_env("ASSISTML_BATCH_SIZE", &mut self.selection.batch_size)?;
        override_from_env("ASSISTML_MAX_MODELS", &mut self.selection.max_models)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.selection;
        for (name, value) in [
            ("feature_ratio_tolerance", s.feature_ratio_tolerance),
            ("monotonous_filtering_tolerance", s.monotonous_filtering_tolerance),
            ("mutual_info_tolerance", s.mutual_info_tolerance),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(RecommenderError::validation(format!("{} must be a non-negative number", name)));
            }
        }
        if !(0.0..=1.0).contains(&s.similarity_ratio_threshold) {
            return Err(RecommenderError::validation("similarity_ratio_threshold must lie in [0, 1]"));
        }
        if s.batch_size == 0 || s.max_models == 0 {
            return Err(RecommenderError::validation("batch_size and max_models must be positive"));
        }

        let c = &self.clustering;
        if !(c.eps > 0.0 && c.eps.is_finite()) {
            return Err(RecommenderError::validation("clustering eps must be positive"));
        }
        if c.min_samples == 0 {
            return Err(RecommenderError::validation("clustering min_samples must be at least 1"));
        }
        if !(0.0..1.0).contains(&c.majority_ratio) {
            return Err(RecommenderError::validation("majority_ratio must lie in [0, 1)"));
        }

        let r = &self.ranking;
        if !(r.lambda_penalty >= 0.0 && r.lambda_penalty.is_finite()) {
            return Err(RecommenderError::validation("lambda_penalty must be non-negative"));
        }
        if !(r.hyperparameter_resolution > 0.0 && r.hyperparameter_resolution.is_finite()) {
            return Err(RecommenderError::validation("hyperparameter_resolution must be positive"));
        }

        if self.report.top_k == 0 || self.report.top_n == 0 {
            return Err(RecommenderError::validation("top_k and top_n must be positive"));
        }
        if self.retry.max_attempts == 0 || self.retry.multiplier < 1.0 {
            return Err(RecommenderError::validation("retry needs at least one attempt and a multiplier >= 1"));
        }
        Ok(())
    }
}

fn override_from_env<T: FromStr>(key: &str, slot: &mut T) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        let parsed = raw
            .trim()
            .parse::<T>()
            .map_err(|_| RecommenderError::validation(format!("{} has an invalid value '{}'", key, raw)))?;
        debug!(key, value = %raw, "Config override from environment");
        *slot = parsed;
    }
    Ok(())
}
