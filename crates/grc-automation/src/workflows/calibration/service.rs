use std::sync::Arc;

use tracing::{debug, info};

use super::domain::{
    CalibrationCell, CalibrationRequest, CalibrationRun, RunId, RunImport, SampleInput,
    ValidationSample,
};
use super::repository::CalibrationBackend;
use super::stats::{
    classify_outliers_with, sort_runs_by_period, CalibrationSummary, OutlierThresholds,
};
use super::weights::{
    SuggestionDraft, SuggestionId, WeightComparisonReport, WeightPublication, WeightSet,
    WeightSuggestion, WeightVersion,
};
use crate::error::GrcError;
use crate::tenant::{AccessContext, Capability};

/// Tenant-scoped calibration queries on top of a `CalibrationBackend`.
pub struct CalibrationService<B> {
    backend: Arc<B>,
    thresholds: OutlierThresholds,
}

impl<B> CalibrationService<B>
where
    B: CalibrationBackend + 'static,
{
    pub fn new(backend: Arc<B>, thresholds: OutlierThresholds) -> Self {
        Self {
            backend,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> OutlierThresholds {
        self.thresholds
    }

    /// Validates the request before the backend sees it. Failures are not retried.
    pub fn run_calibration(
        &self,
        context: &AccessContext,
        request: CalibrationRequest,
    ) -> Result<CalibrationRun, GrcError> {
        let tenant = context.require(Capability::CalibrationRun)?;
        request.validate()?;

        let run = self.backend.run_calibration(tenant, &request)?;
        info!(
            tenant = %tenant,
            run_id = %run.id.0,
            model_version = run.model_version,
            sample_size = run.sample_size,
            "calibration run completed"
        );
        Ok(run)
    }

    pub fn record_sample(
        &self,
        context: &AccessContext,
        input: SampleInput,
    ) -> Result<ValidationSample, GrcError> {
        let tenant = context.require(Capability::CalibrationRun)?;
        let sample = self.backend.register_sample(
            tenant,
            input.predicted_score,
            input.actual_score,
            input.observed_on,
        )?;
        debug!(tenant = %tenant, sample_id = %sample.id.0, "validation sample recorded");
        Ok(sample)
    }

    /// Stores a run computed by the hosted pipeline; nothing is written if any check fails.
    pub fn import_run(
        &self,
        context: &AccessContext,
        import: RunImport,
    ) -> Result<CalibrationRun, GrcError> {
        let tenant = context.require(Capability::CalibrationRun)?;
        let cell_count = import.cells.len();
        let run = self.backend.import_run(tenant, import.run, import.cells)?;
        info!(
            tenant = %tenant,
            run_id = %run.id.0,
            cells = cell_count,
            sample_size = run.sample_size,
            "calibration run imported"
        );
        Ok(run)
    }

    pub fn publish_weights(
        &self,
        context: &AccessContext,
        publication: WeightPublication,
    ) -> Result<WeightVersion, GrcError> {
        let tenant = context.require(Capability::CalibrationRun)?;
        let published = self
            .backend
            .publish_weights(tenant, publication.version, publication.weights)?;
        info!(tenant = %tenant, version = published.version, "weight version published");
        Ok(published)
    }

    pub fn weight_version(
        &self,
        context: &AccessContext,
        version: u32,
    ) -> Result<WeightVersion, GrcError> {
        let tenant = context.require(Capability::CalibrationRead)?;
        self.backend
            .current_weights(tenant, version)?
            .ok_or_else(|| GrcError::not_found("weight_version", version.to_string()))
    }

    pub fn add_suggestion(
        &self,
        context: &AccessContext,
        draft: SuggestionDraft,
    ) -> Result<WeightSuggestion, GrcError> {
        let tenant = context.require(Capability::CalibrationRun)?;
        let suggestion = self.backend.add_suggestion(
            tenant,
            draft.source_weight_version,
            draft.suggested,
            draft.rationale,
        )?;
        info!(
            tenant = %tenant,
            suggestion_id = %suggestion.id.0,
            source_weight_version = suggestion.source_weight_version,
            "weight suggestion stored"
        );
        Ok(suggestion)
    }

    pub fn list_runs(&self, context: &AccessContext) -> Result<Vec<CalibrationRun>, GrcError> {
        let tenant = context.require(Capability::CalibrationRead)?;
        let mut runs = self.backend.list_runs(tenant)?;
        sort_runs_by_period(&mut runs);
        Ok(runs)
    }

    pub fn cells(
        &self,
        context: &AccessContext,
        run_id: &RunId,
    ) -> Result<Vec<CalibrationCell>, GrcError> {
        let tenant = context.require(Capability::CalibrationRead)?;
        self.backend.run_cells(tenant, run_id)
    }

    pub fn outliers(
        &self,
        context: &AccessContext,
        run_id: &RunId,
    ) -> Result<Vec<CalibrationCell>, GrcError> {
        let cells = self.cells(context, run_id)?;
        let outliers = classify_outliers_with(&cells, &self.thresholds);
        debug!(run_id = %run_id.0, cells = cells.len(), outliers = outliers.len(), "classified calibration cells");
        Ok(outliers)
    }

    pub fn summary(&self, context: &AccessContext) -> Result<CalibrationSummary, GrcError> {
        let runs = self.list_runs(context)?;
        Ok(CalibrationSummary::from_runs(&runs))
    }

    pub fn compare_weights(
        &self,
        context: &AccessContext,
        current: &WeightSet,
        suggested: &WeightSet,
    ) -> Result<WeightComparisonReport, GrcError> {
        context.require(Capability::CalibrationRead)?;
        Ok(WeightComparisonReport::new(current, suggested))
    }

    /// Suggestions newest first.
    pub fn suggestions(&self, context: &AccessContext) -> Result<Vec<WeightSuggestion>, GrcError> {
        let tenant = context.require(Capability::CalibrationRead)?;
        self.backend.suggestions(tenant)
    }

    /// Compares a stored suggestion against the weights it was derived from.
    pub fn compare_suggestion(
        &self,
        context: &AccessContext,
        suggestion_id: &SuggestionId,
    ) -> Result<WeightComparisonReport, GrcError> {
        let tenant = context.require(Capability::CalibrationRead)?;
        let suggestion = self
            .backend
            .suggestions(tenant)?
            .into_iter()
            .find(|suggestion| &suggestion.id == suggestion_id)
            .ok_or_else(|| GrcError::not_found("weight_suggestion", suggestion_id.0.clone()))?;
        let current = self
            .backend
            .current_weights(tenant, suggestion.source_weight_version)?
            .ok_or_else(|| {
                GrcError::not_found(
                    "weight_version",
                    suggestion.source_weight_version.to_string(),
                )
            })?;

        Ok(WeightComparisonReport::new(
            &current.weights,
            &suggestion.suggested,
        ))
    }
}
