use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};

use super::domain::{
    next_run_id, CalibrationCell, CalibrationRequest, CalibrationRun, OverallStatus, RunId,
    ValidationSample,
};
use super::grid::CalibrationGrid;
use super::weights::{next_suggestion_id, WeightSet, WeightSuggestion, WeightVersion};
use crate::error::GrcError;
use crate::store::TenantTable;
use crate::tenant::TenantId;

/// Seam for the remote calibration pipeline.
///
/// Implementations own run classification; `overall_status` and `correlation_score` are passed
/// through untouched.
pub trait CalibrationBackend: Send + Sync {
    fn run_calibration(
        &self,
        tenant: &TenantId,
        request: &CalibrationRequest,
    ) -> Result<CalibrationRun, GrcError>;
    fn list_runs(&self, tenant: &TenantId) -> Result<Vec<CalibrationRun>, GrcError>;
    /// Cells of one run; unknown or foreign run ids are `NotFound`.
    fn run_cells(&self, tenant: &TenantId, run_id: &RunId)
        -> Result<Vec<CalibrationCell>, GrcError>;
    fn current_weights(
        &self,
        tenant: &TenantId,
        version: u32,
    ) -> Result<Option<WeightVersion>, GrcError>;
    fn suggestions(&self, tenant: &TenantId) -> Result<Vec<WeightSuggestion>, GrcError>;

    fn register_sample(
        &self,
        tenant: &TenantId,
        predicted_score: f64,
        actual_score: f64,
        observed_on: NaiveDate,
    ) -> Result<ValidationSample, GrcError>;
    /// Stores a run computed elsewhere; the run and every cell must belong to `tenant`.
    fn import_run(
        &self,
        tenant: &TenantId,
        run: CalibrationRun,
        cells: Vec<CalibrationCell>,
    ) -> Result<CalibrationRun, GrcError>;
    fn publish_weights(
        &self,
        tenant: &TenantId,
        version: u32,
        weights: WeightSet,
    ) -> Result<WeightVersion, GrcError>;
    fn add_suggestion(
        &self,
        tenant: &TenantId,
        source_weight_version: u32,
        suggested: WeightSet,
        rationale: Option<String>,
    ) -> Result<WeightSuggestion, GrcError>;
}

/// Backend that builds runs from locally registered validation samples.
#[derive(Debug)]
pub struct InMemoryCalibrationBackend {
    samples: TenantTable<ValidationSample>,
    runs: TenantTable<CalibrationRun>,
    cells: TenantTable<CalibrationCell>,
    weights: TenantTable<WeightVersion>,
    suggestions: TenantTable<WeightSuggestion>,
}

impl Default for InMemoryCalibrationBackend {
    fn default() -> Self {
        Self {
            samples: TenantTable::new("validation_sample"),
            runs: TenantTable::new("calibration_run"),
            cells: TenantTable::new("calibration_cell"),
            weights: TenantTable::new("weight_version"),
            suggestions: TenantTable::new("weight_suggestion"),
        }
    }
}

impl InMemoryCalibrationBackend {
    fn store_run(
        &self,
        tenant: &TenantId,
        run: CalibrationRun,
        cells: Vec<CalibrationCell>,
    ) -> Result<CalibrationRun, GrcError> {
        let key = run.id.0.clone();
        let stored = self.runs.insert(tenant, &key, run)?;
        for cell in cells {
            let key = cell.storage_key();
            self.cells.insert(tenant, &key, cell)?;
        }
        Ok(stored)
    }
}

impl CalibrationBackend for InMemoryCalibrationBackend {
    fn run_calibration(
        &self,
        tenant: &TenantId,
        request: &CalibrationRequest,
    ) -> Result<CalibrationRun, GrcError> {
        let samples: Vec<ValidationSample> = self
            .samples
            .list(tenant)?
            .into_iter()
            .filter(|sample| request.covers(sample.observed_on))
            .collect();
        let grid = CalibrationGrid::from_samples(&samples);

        let run = CalibrationRun {
            id: next_run_id(),
            tenant_id: tenant.clone(),
            model_version: request.model_version,
            period_start: request.period_start,
            period_end: request.period_end,
            run_label: request.run_label.clone(),
            description: request.description.clone(),
            sample_size: grid.sample_size(),
            avg_validation_gap: grid.avg_gap(),
            correlation_score: None,
            overall_status: OverallStatus::Unknown,
            created_at: Utc::now(),
        };
        let cells = grid.into_cells(&run.id, tenant);
        self.store_run(tenant, run, cells)
    }

    fn list_runs(&self, tenant: &TenantId) -> Result<Vec<CalibrationRun>, GrcError> {
        self.runs.list(tenant)
    }

    fn run_cells(
        &self,
        tenant: &TenantId,
        run_id: &RunId,
    ) -> Result<Vec<CalibrationCell>, GrcError> {
        if self.runs.get(tenant, &run_id.0)?.is_none() {
            return Err(GrcError::not_found("calibration_run", run_id.0.clone()));
        }
        let mut cells: Vec<CalibrationCell> = self
            .cells
            .list(tenant)?
            .into_iter()
            .filter(|cell| &cell.run_id == run_id)
            .collect();
        cells.sort_by_key(|cell| (cell.predicted_bucket, cell.actual_bucket));
        Ok(cells)
    }

    fn current_weights(
        &self,
        tenant: &TenantId,
        version: u32,
    ) -> Result<Option<WeightVersion>, GrcError> {
        self.weights.get(tenant, &version.to_string())
    }

    fn suggestions(&self, tenant: &TenantId) -> Result<Vec<WeightSuggestion>, GrcError> {
        let mut suggestions = self.suggestions.list(tenant)?;
        suggestions.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(suggestions)
    }

    fn register_sample(
        &self,
        tenant: &TenantId,
        predicted_score: f64,
        actual_score: f64,
        observed_on: NaiveDate,
    ) -> Result<ValidationSample, GrcError> {
        let sample =
            ValidationSample::new(tenant.clone(), predicted_score, actual_score, observed_on)?;
        let key = sample.id.0.clone();
        self.samples.insert(tenant, &key, sample)
    }

    fn publish_weights(
        &self,
        tenant: &TenantId,
        version: u32,
        weights: WeightSet,
    ) -> Result<WeightVersion, GrcError> {
        let row = WeightVersion {
            tenant_id: tenant.clone(),
            version,
            weights,
            published_at: Utc::now(),
        };
        self.weights.insert(tenant, &version.to_string(), row)
    }

    fn add_suggestion(
        &self,
        tenant: &TenantId,
        source_weight_version: u32,
        suggested: WeightSet,
        rationale: Option<String>,
    ) -> Result<WeightSuggestion, GrcError> {
        let suggestion = WeightSuggestion {
            id: next_suggestion_id(),
            tenant_id: tenant.clone(),
            source_weight_version,
            suggested,
            rationale,
            created_at: Utc::now(),
        };
        let key = suggestion.id.0.clone();
        self.suggestions.insert(tenant, &key, suggestion)
    }

    /// The cells must belong to the run and add up to its sample size.
    fn import_run(
        &self,
        tenant: &TenantId,
        run: CalibrationRun,
        cells: Vec<CalibrationCell>,
    ) -> Result<CalibrationRun, GrcError> {
        if let Some(owner) = std::iter::once(&run.tenant_id)
            .chain(cells.iter().map(|cell| &cell.tenant_id))
            .find(|owner| *owner != tenant)
        {
            return Err(GrcError::TenantMismatch {
                expected: tenant.to_string(),
                found: owner.to_string(),
            });
        }
        let counted: u64 = cells.iter().map(|cell| u64::from(cell.count_samples)).sum();
        if counted != run.sample_size {
            return Err(GrcError::Conflict {
                resource: "calibration_run",
                detail: format!(
                    "cells hold {counted} samples but the run reports {}",
                    run.sample_size
                ),
            });
        }
        if let Some(stray) = cells.iter().find(|cell| cell.run_id != run.id) {
            return Err(GrcError::Conflict {
                resource: "calibration_cell",
                detail: format!("cell belongs to run '{}'", stray.run_id.0),
            });
        }
        let mut pairs = BTreeSet::new();
        if let Some(duplicate) = cells
            .iter()
            .find(|cell| !pairs.insert((cell.predicted_bucket, cell.actual_bucket)))
        {
            return Err(GrcError::Conflict {
                resource: "calibration_cell",
                detail: format!(
                    "duplicate cell {} -> {}",
                    duplicate.predicted_bucket.label(),
                    duplicate.actual_bucket.label()
                ),
            });
        }
        self.store_run(tenant, run, cells)
    }
}
