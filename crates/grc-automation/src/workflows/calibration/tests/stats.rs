use std::collections::BTreeMap;

use super::common::*;
use crate::config::CalibrationConfig;
use crate::workflows::calibration::domain::{OverallStatus, ScoreBucket};
use crate::workflows::calibration::stats::{
    classify_outliers, classify_outliers_with, compute_aggregate_stats, sort_runs_by_period,
    trend, AggregateStats, CalibrationSummary, OutlierThresholds,
};

#[test]
fn empty_input_yields_zeroed_stats() {
    assert_eq!(compute_aggregate_stats(&[]), AggregateStats::default());
    let stats = compute_aggregate_stats(&[]);
    assert_eq!(stats.total_validations, 0);
    assert_eq!(stats.avg_gap, 0.0);
    assert_eq!(stats.avg_correlation, 0.0);
    assert!(stats.status_counts.is_empty());
}

#[test]
fn aggregates_totals_means_and_status_histogram() {
    let runs = [
        run("run-a", 100, Some(8.0), Some(80.0), OverallStatus::Good),
        run("run-b", 50, Some(30.0), Some(40.0), OverallStatus::Bad),
    ];

    let stats = compute_aggregate_stats(&runs);
    assert_eq!(stats.total_validations, 150);
    assert!((stats.avg_gap - 19.0).abs() < 1e-9);
    assert!((stats.avg_correlation - 60.0).abs() < 1e-9);
    assert_eq!(
        stats.status_counts,
        BTreeMap::from([(OverallStatus::Good, 1), (OverallStatus::Bad, 1)])
    );
}

#[test]
fn runs_without_values_do_not_drag_means_down() {
    let runs = [
        run("run-a", 10, Some(12.0), None, OverallStatus::Unknown),
        run("run-b", 5, None, None, OverallStatus::Unknown),
    ];

    let stats = compute_aggregate_stats(&runs);
    assert_eq!(stats.total_validations, 15);
    assert!((stats.avg_gap - 12.0).abs() < 1e-9);
    assert_eq!(stats.avg_correlation, 0.0);
    assert_eq!(stats.status_counts.get(&OverallStatus::Unknown), Some(&2));
}

#[test]
fn outlier_classification_uses_sample_and_gap_thresholds() {
    let cells = [
        cell(ScoreBucket::Low, ScoreBucket::Low, 2, Some(1.0)),
        cell(ScoreBucket::Medium, ScoreBucket::Low, 10, Some(26.0)),
        cell(ScoreBucket::High, ScoreBucket::High, 10, Some(24.0)),
        cell(ScoreBucket::VeryHigh, ScoreBucket::VeryHigh, 3, Some(25.0)),
        cell(ScoreBucket::VeryLow, ScoreBucket::VeryLow, 2, None),
    ];

    let outliers = classify_outliers(&cells);
    assert_eq!(outliers, vec![cells[0].clone(), cells[1].clone(), cells[4].clone()]);
    assert_eq!(classify_outliers(&cells), outliers);
}

#[test]
fn thresholds_follow_configuration() {
    let config = CalibrationConfig {
        outlier_min_samples: 5,
        outlier_max_gap: 10.0,
    };
    let thresholds = OutlierThresholds::from(&config);
    let cells = [
        cell(ScoreBucket::Low, ScoreBucket::Low, 4, Some(1.0)),
        cell(ScoreBucket::High, ScoreBucket::High, 10, Some(12.0)),
        cell(ScoreBucket::Medium, ScoreBucket::Medium, 10, Some(9.0)),
    ];

    assert_eq!(classify_outliers_with(&cells, &thresholds).len(), 2);
    assert_eq!(
        OutlierThresholds::default(),
        OutlierThresholds {
            min_samples: 3,
            max_gap: 25.0
        }
    );
}

#[test]
fn runs_sort_by_period_start_with_undated_first() {
    let mut february = run("run-b", 1, None, None, OverallStatus::Unknown);
    february.period_start = Some(date(2, 1));
    let mut january = run("run-c", 1, None, None, OverallStatus::Unknown);
    january.period_start = Some(date(1, 1));
    let undated = run("run-a", 1, None, None, OverallStatus::Unknown);

    let mut runs = vec![february, january, undated];
    sort_runs_by_period(&mut runs);
    let ids: Vec<&str> = runs.iter().map(|run| run.id.0.as_str()).collect();
    assert_eq!(ids, ["run-a", "run-c", "run-b"]);
}

#[test]
fn trend_labels_fall_back_to_model_version() {
    let mut labelled = run("run-a", 1, Some(4.0), Some(91.0), OverallStatus::Good);
    labelled.run_label = Some("Q1 baseline".to_string());
    let mut unlabelled = run("run-b", 1, Some(14.0), None, OverallStatus::Unknown);
    unlabelled.model_version = 3;

    let points = trend(&[labelled, unlabelled]);
    assert_eq!(points[0].label, "Q1 baseline");
    assert_eq!(points[1].label, "v3");
    assert_eq!(points[1].avg_gap, Some(14.0));
}

#[test]
fn summary_reports_accuracy_label() {
    let empty = CalibrationSummary::from_runs(&[]);
    assert_eq!(empty.accuracy, "No Data");
    assert!(empty.latest_run.is_none());

    let runs = [
        run("run-a", 100, Some(8.0), Some(80.0), OverallStatus::Good),
        run("run-b", 50, Some(30.0), Some(40.0), OverallStatus::Bad),
    ];
    let summary = CalibrationSummary::from_runs(&runs);
    assert_eq!(summary.accuracy, "Moderate Accuracy");
    assert_eq!(summary.run_count, 2);
    assert_eq!(
        summary.latest_run.map(|run| run.id.0),
        Some("run-b".to_string())
    );
}
