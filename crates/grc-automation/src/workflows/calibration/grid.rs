use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{CalibrationCell, GapDirection, RunId, ScoreBucket, ValidationSample};
use crate::tenant::TenantId;

#[derive(Debug, Default, Clone, Copy)]
struct CellAccumulator {
    count: u32,
    absolute_gap_total: f64,
    signed_gap_total: f64,
}

/// Populated cell of a predicted x actual grid before it is attached to a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub predicted_bucket: ScoreBucket,
    pub actual_bucket: ScoreBucket,
    pub count_samples: u32,
    pub avg_gap: f64,
    pub gap_direction: GapDirection,
}

/// Predicted x actual bucket matrix built from validation samples.
///
/// Only populated pairings are kept, ordered by (predicted bucket, actual bucket).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalibrationGrid {
    cells: Vec<GridCell>,
}

impl CalibrationGrid {
    pub fn from_samples<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a ValidationSample>,
    {
        let mut pairs: BTreeMap<(ScoreBucket, ScoreBucket), CellAccumulator> = BTreeMap::new();

        for sample in samples {
            let (Some(predicted), Some(actual)) = (
                ScoreBucket::from_score(sample.predicted_score),
                ScoreBucket::from_score(sample.actual_score),
            ) else {
                continue;
            };
            let entry = pairs.entry((predicted, actual)).or_default();
            let gap = sample.signed_gap();
            entry.count += 1;
            entry.absolute_gap_total += gap.abs();
            entry.signed_gap_total += gap;
        }

        let cells = pairs
            .into_iter()
            .map(|((predicted_bucket, actual_bucket), totals)| {
                let count = f64::from(totals.count);
                GridCell {
                    predicted_bucket,
                    actual_bucket,
                    count_samples: totals.count,
                    avg_gap: totals.absolute_gap_total / count,
                    gap_direction: GapDirection::from_mean_signed_gap(
                        totals.signed_gap_total / count,
                    ),
                }
            })
            .collect();

        Self { cells }
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn sample_size(&self) -> u64 {
        self.cells
            .iter()
            .map(|cell| u64::from(cell.count_samples))
            .sum()
    }

    /// Sample-weighted mean absolute gap across the grid; `None` for an empty grid.
    pub fn avg_gap(&self) -> Option<f64> {
        let samples = self.sample_size();
        if samples == 0 {
            return None;
        }
        let weighted: f64 = self
            .cells
            .iter()
            .map(|cell| cell.avg_gap * f64::from(cell.count_samples))
            .sum();
        Some(weighted / samples as f64)
    }

    pub fn into_cells(self, run_id: &RunId, tenant_id: &TenantId) -> Vec<CalibrationCell> {
        self.cells
            .into_iter()
            .map(|cell| CalibrationCell {
                run_id: run_id.clone(),
                tenant_id: tenant_id.clone(),
                predicted_bucket: cell.predicted_bucket,
                actual_bucket: cell.actual_bucket,
                count_samples: cell.count_samples,
                avg_gap: Some(cell.avg_gap),
                gap_direction: Some(cell.gap_direction),
            })
            .collect()
    }
}
