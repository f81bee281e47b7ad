use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{CalibrationRequest, RunId, RunImport, SampleInput};
use super::repository::CalibrationBackend;
use super::service::CalibrationService;
use super::weights::{SuggestionDraft, SuggestionId, WeightPublication, WeightSet};
use crate::http::{respond, RequestContext};

#[derive(Debug, Deserialize)]
pub(crate) struct CompareWeightsRequest {
    pub(crate) current: WeightSet,
    pub(crate) suggested: WeightSet,
}

pub fn calibration_router<B>(service: Arc<CalibrationService<B>>) -> Router
where
    B: CalibrationBackend + 'static,
{
    Router::new()
        .route("/api/v1/calibration/samples", post(sample_handler::<B>))
        .route(
            "/api/v1/calibration/runs",
            get(list_runs_handler::<B>).post(run_handler::<B>),
        )
        .route(
            "/api/v1/calibration/runs/import",
            post(import_run_handler::<B>),
        )
        .route(
            "/api/v1/calibration/runs/:run_id/cells",
            get(cells_handler::<B>),
        )
        .route(
            "/api/v1/calibration/runs/:run_id/outliers",
            get(outliers_handler::<B>),
        )
        .route("/api/v1/calibration/summary", get(summary_handler::<B>))
        .route("/api/v1/calibration/weights", post(publish_weights_handler::<B>))
        .route(
            "/api/v1/calibration/weights/compare",
            post(compare_weights_handler::<B>),
        )
        .route(
            "/api/v1/calibration/weights/:version",
            get(weight_version_handler::<B>),
        )
        .route(
            "/api/v1/calibration/suggestions",
            get(suggestions_handler::<B>).post(add_suggestion_handler::<B>),
        )
        .route(
            "/api/v1/calibration/suggestions/:suggestion_id/comparison",
            get(suggestion_comparison_handler::<B>),
        )
        .with_state(service)
}

pub(crate) async fn run_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Json(request): Json<CalibrationRequest>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(
        StatusCode::CREATED,
        service.run_calibration(&context, request),
    )
}

pub(crate) async fn list_runs_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(StatusCode::OK, service.list_runs(&context))
}

pub(crate) async fn cells_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Path(run_id): Path<String>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(StatusCode::OK, service.cells(&context, &RunId(run_id)))
}

pub(crate) async fn outliers_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Path(run_id): Path<String>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(StatusCode::OK, service.outliers(&context, &RunId(run_id)))
}

pub(crate) async fn summary_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(StatusCode::OK, service.summary(&context))
}

pub(crate) async fn compare_weights_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Json(request): Json<CompareWeightsRequest>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(
        StatusCode::OK,
        service.compare_weights(&context, &request.current, &request.suggested),
    )
}

pub(crate) async fn suggestions_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(StatusCode::OK, service.suggestions(&context))
}

pub(crate) async fn suggestion_comparison_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Path(suggestion_id): Path<String>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(
        StatusCode::OK,
        service.compare_suggestion(&context, &SuggestionId(suggestion_id)),
    )
}

pub(crate) async fn sample_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Json(input): Json<SampleInput>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(StatusCode::CREATED, service.record_sample(&context, input))
}

pub(crate) async fn import_run_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Json(import): Json<RunImport>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(StatusCode::CREATED, service.import_run(&context, import))
}

pub(crate) async fn publish_weights_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Json(publication): Json<WeightPublication>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(
        StatusCode::CREATED,
        service.publish_weights(&context, publication),
    )
}

pub(crate) async fn weight_version_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Path(version): Path<u32>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(StatusCode::OK, service.weight_version(&context, version))
}

pub(crate) async fn add_suggestion_handler<B>(
    State(service): State<Arc<CalibrationService<B>>>,
    RequestContext(context): RequestContext,
    Json(draft): Json<SuggestionDraft>,
) -> Response
where
    B: CalibrationBackend + 'static,
{
    respond(StatusCode::CREATED, service.add_suggestion(&context, draft))
}
