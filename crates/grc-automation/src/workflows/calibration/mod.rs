//! Calibration runs, predicted x actual cells, and weight suggestions.

pub mod domain;
pub mod grid;
pub mod repository;
pub mod router;
pub mod service;
pub mod stats;
pub mod weights;

#[cfg(test)]
mod tests;

pub use domain::{
    accuracy_label, CalibrationCell, CalibrationRequest, CalibrationRun, GapDirection,
    OverallStatus, RunId, RunImport, SampleId, SampleInput, ScoreBucket, ValidationSample,
};
pub use grid::{CalibrationGrid, GridCell};
pub use repository::{CalibrationBackend, InMemoryCalibrationBackend};
pub use router::calibration_router;
pub use service::CalibrationService;
pub use stats::{
    classify_outliers, classify_outliers_with, compute_aggregate_stats, sort_runs_by_period,
    trend, AggregateStats, CalibrationSummary, OutlierThresholds, TrendPoint,
};
pub use weights::{
    compare_weights, ChangeKind, SuggestionDraft, SuggestionId, WeightComparison,
    WeightComparisonReport, WeightDimension, WeightPublication, WeightSet, WeightSuggestion,
    WeightVersion,
};
