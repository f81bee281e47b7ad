use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{accuracy_label, CalibrationCell, CalibrationRun, OverallStatus, RunId};
use crate::config::CalibrationConfig;

/// Summary numbers across a list of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_validations: u64,
    pub avg_gap: f64,
    pub avg_correlation: f64,
    pub status_counts: BTreeMap<OverallStatus, usize>,
}

/// Reduces runs into totals. Means only consider runs that report the value.
pub fn compute_aggregate_stats(runs: &[CalibrationRun]) -> AggregateStats {
    let mut stats = AggregateStats::default();
    let (mut gap_total, mut gap_runs) = (0.0, 0usize);
    let (mut correlation_total, mut correlation_runs) = (0.0, 0usize);

    for run in runs {
        stats.total_validations += run.sample_size;
        if let Some(gap) = run.avg_validation_gap {
            gap_total += gap;
            gap_runs += 1;
        }
        if let Some(correlation) = run.correlation_score {
            correlation_total += correlation;
            correlation_runs += 1;
        }
        *stats.status_counts.entry(run.overall_status).or_insert(0) += 1;
    }

    stats.avg_gap = mean(gap_total, gap_runs);
    stats.avg_correlation = mean(correlation_total, correlation_runs);
    stats
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Review thresholds for flagging cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierThresholds {
    pub min_samples: u32,
    pub max_gap: f64,
}

impl Default for OutlierThresholds {
    fn default() -> Self {
        Self::from(&CalibrationConfig::default())
    }
}

impl From<&CalibrationConfig> for OutlierThresholds {
    fn from(config: &CalibrationConfig) -> Self {
        Self {
            min_samples: config.outlier_min_samples,
            max_gap: config.outlier_max_gap,
        }
    }
}

impl OutlierThresholds {
    pub fn is_outlier(&self, cell: &CalibrationCell) -> bool {
        cell.count_samples < self.min_samples
            || cell.avg_gap.is_some_and(|gap| gap > self.max_gap)
    }
}

/// Cells with too few samples or too wide a gap, in input order.
pub fn classify_outliers(cells: &[CalibrationCell]) -> Vec<CalibrationCell> {
    classify_outliers_with(cells, &OutlierThresholds::default())
}

pub fn classify_outliers_with(
    cells: &[CalibrationCell],
    thresholds: &OutlierThresholds,
) -> Vec<CalibrationCell> {
    cells
        .iter()
        .filter(|cell| thresholds.is_outlier(cell))
        .cloned()
        .collect()
}

/// Chart point for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub run_id: RunId,
    pub label: String,
    pub period_start: Option<NaiveDate>,
    pub avg_gap: Option<f64>,
    pub correlation_score: Option<f64>,
}

/// Maps runs to chart points in list order. Unlabelled runs fall back to their model version.
pub fn trend(runs: &[CalibrationRun]) -> Vec<TrendPoint> {
    runs.iter()
        .map(|run| TrendPoint {
            run_id: run.id.clone(),
            label: run
                .run_label
                .clone()
                .filter(|label| !label.trim().is_empty())
                .unwrap_or_else(|| format!("v{}", run.model_version)),
            period_start: run.period_start,
            avg_gap: run.avg_validation_gap,
            correlation_score: run.correlation_score,
        })
        .collect()
}

/// Period start ascending; runs without a start come first, ties by id.
pub fn period_ordering(left: &CalibrationRun, right: &CalibrationRun) -> Ordering {
    left.period_start
        .cmp(&right.period_start)
        .then_with(|| left.id.cmp(&right.id))
}

pub fn sort_runs_by_period(runs: &mut [CalibrationRun]) {
    runs.sort_by(period_ordering);
}

/// Dashboard payload combining the aggregate, its accuracy label, and the trend line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationSummary {
    pub run_count: usize,
    pub stats: AggregateStats,
    pub accuracy: &'static str,
    pub trend: Vec<TrendPoint>,
    pub latest_run: Option<CalibrationRun>,
}

impl CalibrationSummary {
    /// Expects runs already in period order; the last one is reported as latest.
    pub fn from_runs(runs: &[CalibrationRun]) -> Self {
        let stats = compute_aggregate_stats(runs);
        let accuracy = if runs.iter().any(|run| run.avg_validation_gap.is_some()) {
            accuracy_label(Some(stats.avg_gap))
        } else {
            accuracy_label(None)
        };

        Self {
            run_count: runs.len(),
            accuracy,
            trend: trend(runs),
            latest_run: runs.last().cloned(),
            stats,
        }
    }
}
