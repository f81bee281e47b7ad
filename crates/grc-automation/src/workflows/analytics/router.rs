use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::actions_report::{build_actions_report, RemediationAction};
use super::content::{summarize_content, ContentInteraction};
use super::export::{to_csv_string, CsvRecord};
use crate::error::GrcError;
use crate::http::{respond, RequestContext};
use crate::tenant::{AccessContext, Capability};

#[derive(Debug, Deserialize)]
pub(crate) struct ContentRequest {
    #[serde(default)]
    pub(crate) interactions: Vec<ContentInteraction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionsRequest {
    #[serde(default)]
    pub(crate) actions: Vec<RemediationAction>,
}

/// Stateless analytics endpoints over caller-supplied rows.
pub fn analytics_router() -> Router {
    Router::new()
        .route(
            "/api/v1/analytics/content/summary",
            post(content_summary_handler),
        )
        .route(
            "/api/v1/analytics/content/export",
            post(content_export_handler),
        )
        .route(
            "/api/v1/analytics/actions/report",
            post(actions_report_handler),
        )
        .route(
            "/api/v1/analytics/actions/export",
            post(actions_export_handler),
        )
}

pub(crate) async fn content_summary_handler(
    RequestContext(context): RequestContext,
    Json(request): Json<ContentRequest>,
) -> Response {
    let result = context
        .require(Capability::AnalyticsExport)
        .map(|_| summarize_content(&request.interactions));
    respond(StatusCode::OK, result)
}

pub(crate) async fn content_export_handler(
    RequestContext(context): RequestContext,
    Json(request): Json<ContentRequest>,
) -> Response {
    let rows = summarize_content(&request.interactions).content;
    csv_response(&context, "content-analytics", &rows)
}

pub(crate) async fn actions_report_handler(
    RequestContext(context): RequestContext,
    Json(request): Json<ActionsRequest>,
) -> Response {
    let result = context
        .require(Capability::AnalyticsExport)
        .map(|_| build_actions_report(&request.actions));
    respond(StatusCode::OK, result)
}

pub(crate) async fn actions_export_handler(
    RequestContext(context): RequestContext,
    Json(request): Json<ActionsRequest>,
) -> Response {
    csv_response(&context, "actions-report", &request.actions)
}

fn csv_response<R: CsvRecord>(context: &AccessContext, prefix: &str, rows: &[R]) -> Response {
    match export_csv(context, prefix, rows) {
        Ok((filename, body)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            body,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

fn export_csv<R: CsvRecord>(
    context: &AccessContext,
    prefix: &str,
    rows: &[R],
) -> Result<(String, String), GrcError> {
    let tenant = context.require(Capability::AnalyticsExport)?;
    let body = to_csv_string(rows)?;
    let filename = format!("{prefix}-{}.csv", Utc::now().format("%Y-%m-%d"));
    info!(tenant = %tenant, export = prefix, rows = rows.len(), "analytics export generated");
    Ok((filename, body))
}
