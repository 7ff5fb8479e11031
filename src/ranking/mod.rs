//! Ranking
//!
//! Groups candidate models by implementation, dataset and standardized
//! hyperparameter configuration, scores every level and assembles the
//! recommendation report.

pub mod document_cache;
pub mod hyperparameter_analytics;
pub mod hyperparameter_configuration;
pub mod implementation_dataset_group;
pub mod implementation_group;
pub mod lock_table;
pub mod metric_analytics;
pub mod normalizer;
pub mod report;

pub use document_cache::DocumentCache;
pub use hyperparameter_analytics::HyperparameterAnalytics;
pub use hyperparameter_configuration::{ConfigurationValue, HyperparameterConfiguration, RawConfiguration};
pub use implementation_dataset_group::{
    DatasetGroupReport, GroupState, ImplementationDatasetGroup, RankedConfiguration,
};
pub use implementation_group::{ImplementationGroup, ImplementationGroupReport};
pub use lock_table::LockTable;
pub use metric_analytics::{AggregatedMetrics, MetricAnalytics, MetricSummary, ScoreVector};
pub use normalizer::Normalizer;
pub use report::{
    DistrustPointCategory, ModelGroup, RecommendationReport, Report, ReportState, ReportSummary,
};
