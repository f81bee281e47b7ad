use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{Document, RuleDraft, RuleId, RuleUpdate, TriggerEvent};
use super::repository::WorkflowRuleRepository;
use super::selector::MatchMode;
use super::service::{AutomationRequest, DocumentWorkflowService};
use crate::audit::AuditSink;
use crate::http::{respond, RequestContext};
use crate::tenant::AppCode;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RuleListQuery {
    #[serde(default)]
    pub(crate) app_code: Option<String>,
    #[serde(default)]
    pub(crate) include_disabled: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeleteQuery {
    #[serde(default)]
    pub(crate) confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ToggleRequest {
    #[serde(default)]
    pub(crate) enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExecutionQuery {
    #[serde(default)]
    pub(crate) rule_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentEventRequest {
    pub(crate) document: Document,
    pub(crate) trigger_event: TriggerEvent,
    #[serde(default)]
    pub(crate) mode: MatchMode,
}

/// Router exposing rule management, execution, and automation endpoints.
pub fn workflow_rule_router<R, A>(service: Arc<DocumentWorkflowService<R, A>>) -> Router
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/workflow-rules",
            get(list_handler::<R, A>).post(create_handler::<R, A>),
        )
        .route(
            "/api/v1/workflow-rules/:rule_id",
            put(update_handler::<R, A>).delete(delete_handler::<R, A>),
        )
        .route(
            "/api/v1/workflow-rules/:rule_id/toggle",
            post(toggle_handler::<R, A>),
        )
        .route(
            "/api/v1/workflow-automation",
            post(automation_handler::<R, A>),
        )
        .route(
            "/api/v1/workflow-events",
            post(document_event_handler::<R, A>),
        )
        .route(
            "/api/v1/workflow-executions",
            get(executions_handler::<R, A>),
        )
        .with_state(service)
}

pub(crate) async fn list_handler<R, A>(
    State(service): State<Arc<DocumentWorkflowService<R, A>>>,
    RequestContext(context): RequestContext,
    Query(query): Query<RuleListQuery>,
) -> Response
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    let result = if query.include_disabled {
        service.list_rules(&context)
    } else {
        let app_code = query.app_code.map(AppCode::new);
        service.list_applicable_rules(&context, app_code.as_ref())
    };
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_handler<R, A>(
    State(service): State<Arc<DocumentWorkflowService<R, A>>>,
    RequestContext(context): RequestContext,
    Json(draft): Json<RuleDraft>,
) -> Response
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::CREATED, service.create_rule(&context, draft))
}

pub(crate) async fn update_handler<R, A>(
    State(service): State<Arc<DocumentWorkflowService<R, A>>>,
    RequestContext(context): RequestContext,
    Path(rule_id): Path<String>,
    Json(update): Json<RuleUpdate>,
) -> Response
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.update_rule(&context, &RuleId(rule_id), update),
    )
}

pub(crate) async fn toggle_handler<R, A>(
    State(service): State<Arc<DocumentWorkflowService<R, A>>>,
    RequestContext(context): RequestContext,
    Path(rule_id): Path<String>,
    body: Option<Json<ToggleRequest>>,
) -> Response
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    let enabled = body.and_then(|Json(request)| request.enabled);
    respond(
        StatusCode::OK,
        service.toggle_rule(&context, &RuleId(rule_id), enabled),
    )
}

pub(crate) async fn delete_handler<R, A>(
    State(service): State<Arc<DocumentWorkflowService<R, A>>>,
    RequestContext(context): RequestContext,
    Path(rule_id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Response
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.delete_rule(&context, &RuleId(rule_id), query.confirm),
    )
}

pub(crate) async fn automation_handler<R, A>(
    State(service): State<Arc<DocumentWorkflowService<R, A>>>,
    RequestContext(context): RequestContext,
    Json(request): Json<AutomationRequest>,
) -> Response
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.run_automation(&context, request))
}

pub(crate) async fn document_event_handler<R, A>(
    State(service): State<Arc<DocumentWorkflowService<R, A>>>,
    RequestContext(context): RequestContext,
    Json(request): Json<DocumentEventRequest>,
) -> Response
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.process_document_event(
            &context,
            &request.document,
            request.trigger_event,
            request.mode,
        ),
    )
}

pub(crate) async fn executions_handler<R, A>(
    State(service): State<Arc<DocumentWorkflowService<R, A>>>,
    RequestContext(context): RequestContext,
    Query(query): Query<ExecutionQuery>,
) -> Response
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    let rule_id = query.rule_id.map(RuleId);
    respond(StatusCode::OK, service.executions(&context, rule_id.as_ref()))
}
