//! Cascading dataset-similarity resolver
//!
//! Tier task sets are nested by construction: each tier filters the tier
//! below it. Resolution walks from the strictest tier down and stops at the
//! first one that yields models.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::similarity;
use crate::catalog::{CandidateModel, Dataset, DocumentId, Task, TaskType};
use crate::config::SelectionSettings;
use crate::error::Result;
use crate::store::{DocumentStore, RetryPolicy};

/// How strict the dataset match behind a candidate set was; 3 is strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SimilarityLevel {
    /// Same task type only.
    TaskType = 0,
    /// Same set of present data types.
    DataTypes = 1,
    /// Data-type ratios within tolerance.
    DataTypeRatios = 2,
    /// Feature meta-data close enough.
    FeatureMetadata = 3,
}

impl SimilarityLevel {
    pub const DESCENDING: [SimilarityLevel; 4] = [
        SimilarityLevel::FeatureMetadata,
        SimilarityLevel::DataTypeRatios,
        SimilarityLevel::DataTypes,
        SimilarityLevel::TaskType,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<SimilarityLevel> for u8 {
    fn from(level: SimilarityLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for SimilarityLevel {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(SimilarityLevel::TaskType),
            1 => Ok(SimilarityLevel::DataTypes),
            2 => Ok(SimilarityLevel::DataTypeRatios),
            3 => Ok(SimilarityLevel::FeatureMetadata),
            other => Err(format!("similarity level {} out of range 0..=3", other)),
        }
    }
}

impl fmt::Display for SimilarityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Tasks admitted by each tier, indexed by level
#[derive(Debug, Clone, Default)]
pub struct TierTasks {
    tiers: [Vec<Arc<Task>>; 4],
}

impl TierTasks {
    pub fn at(&self, level: SimilarityLevel) -> &[Arc<Task>] {
        &self.tiers[level.as_u8() as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.tiers[0].is_empty()
    }
}

/// Outcome of candidate resolution
#[derive(Debug, Clone)]
pub enum Resolution {
    Candidates {
        models: Vec<CandidateModel>,
        level: SimilarityLevel,
    },
    /// Not even tier 0 produced a model.
    Empty,
}

pub struct SimilarityResolver {
    store: Arc<dyn DocumentStore>,
    settings: SelectionSettings,
    retry: RetryPolicy,
}

impl SimilarityResolver {
    pub fn new(store: Arc<dyn DocumentStore>, settings: SelectionSettings, retry: RetryPolicy) -> Self {
        Self { store, settings, retry }
    }

    /// Compute the task set of every tier for `target`.
    pub async fn tier_tasks(&self, task_type: TaskType, target: &Dataset) -> Result<TierTasks> {
        let store = &self.store;

        let tier0: Vec<Arc<Task>> = self
            .retry
            .run("find_tasks_by_type", || store.find_tasks_by_type(task_type))
            .await?
            .into_iter()
            .map(Arc::new)
            .collect();
        if tier0.is_empty() {
            return Ok(TierTasks::default());
        }

        let pattern_ids: HashSet<DocumentId> = self
            .retry
            .run("find_datasets_matching_ratio_pattern", || {
                store.find_datasets_matching_ratio_pattern(target, None)
            })
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

        let tolerance = self.settings.feature_ratio_tolerance;
        let banded: Vec<Dataset> = self
            .retry
            .run("find_datasets_matching_ratio_pattern", || {
                store.find_datasets_matching_ratio_pattern(target, Some(tolerance))
            })
            .await?
            .into_iter()
            .filter(|d| pattern_ids.contains(&d.id))
            .collect();
        let banded_ids: HashSet<DocumentId> = banded.iter().map(|d| d.id.clone()).collect();

        let feature_ids: HashSet<DocumentId> = banded
            .iter()
            .filter(|d| {
                let ratio = similarity::feature_match_ratio(
                    &target.features,
                    &d.features,
                    self.settings.monotonous_filtering_tolerance,
                    self.settings.mutual_info_tolerance,
                );
                debug!(dataset = %d.id, ratio, "Feature match ratio");
                ratio >= self.settings.similarity_ratio_threshold
            })
            .map(|d| d.id.clone())
            .collect();

        let restrict = |tasks: &[Arc<Task>], ids: &HashSet<DocumentId>| -> Vec<Arc<Task>> {
            tasks.iter().filter(|t| ids.contains(&t.dataset_id)).cloned().collect()
        };
        let tier1 = restrict(&tier0, &pattern_ids);
        let tier2 = restrict(&tier1, &banded_ids);
        let tier3 = restrict(&tier2, &feature_ids);

        info!(
            task_type = %task_type,
            tier0 = tier0.len(),
            tier1 = tier1.len(),
            tier2 = tier2.len(),
            tier3 = tier3.len(),
            "Computed similarity tiers"
        );

        Ok(TierTasks {
            tiers: [tier0, tier1, tier2, tier3],
        })
    }

    /// All models trained on `tasks`, fetched page by page up to the
    /// configured maximum.
    pub async fn fetch_models(&self, tasks: &[Arc<Task>]) -> Result<Vec<CandidateModel>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        let by_id: HashMap<&DocumentId, &Arc<Task>> = tasks.iter().map(|t| (&t.id, t)).collect();
        let task_ids: Vec<DocumentId> = tasks.iter().map(|t| t.id.clone()).collect();
        let batch_size = self.settings.batch_size;
        let store = &self.store;

        let mut candidates = Vec::new();
        let mut cursor: Option<DocumentId> = None;
        let mut pages = 0usize;
        loop {
            let page = self
                .retry
                .run("find_models_for_tasks", || {
                    store.find_models_for_tasks(&task_ids, batch_size, cursor.as_ref())
                })
                .await?;
            pages += 1;

            for model in page.models {
                match by_id.get(&model.setup.task_id) {
                    Some(task) => candidates.push(CandidateModel::new(Arc::new(model), Arc::clone(task))),
                    None => warn!(model = %model.id, "Store returned a model for an unrequested task"),
                }
            }

            if candidates.len() >= self.settings.max_models {
                if page.next_cursor.is_some() || candidates.len() > self.settings.max_models {
                    warn!(max_models = self.settings.max_models, "Candidate model limit reached, truncating");
                }
                candidates.truncate(self.settings.max_models);
                break;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(pages, models = candidates.len(), "Fetched candidate models");
        Ok(candidates)
    }

    /// Models of the strictest non-empty tier.
    pub async fn resolve(&self, task_type: TaskType, target: &Dataset) -> Result<Resolution> {
        let tiers = self.tier_tasks(task_type, target).await?;
        if tiers.is_empty() {
            info!(task_type = %task_type, "No tasks of the requested type");
            return Ok(Resolution::Empty);
        }

        for level in SimilarityLevel::DESCENDING {
            let tasks = tiers.at(level);
            if tasks.is_empty() {
                debug!(level = %level, "Tier has no tasks, falling back");
                continue;
            }
            let models = self.fetch_models(tasks).await?;
            if models.is_empty() {
                debug!(level = %level, "Tier has no models, falling back");
                continue;
            }
            info!(level = %level, models = models.len(), "Resolved candidate models");
            return Ok(Resolution::Candidates { models, level });
        }

        info!(task_type = %task_type, "No candidate models at any similarity level");
        Ok(Resolution::Empty)
    }
}
