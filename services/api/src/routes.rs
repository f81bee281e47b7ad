use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use grc_automation::audit::AuditSink;
use grc_automation::workflows::analytics::analytics_router;
use grc_automation::workflows::calibration::{
    calibration_router, CalibrationBackend, CalibrationService,
};
use grc_automation::workflows::document_rules::{
    workflow_rule_router, DocumentWorkflowService, WorkflowRuleRepository,
};
use serde_json::json;
use std::sync::Arc;

/// Module routers merged with the operational endpoints.
pub(crate) fn build_router<R, A, B>(
    workflows: Arc<DocumentWorkflowService<R, A>>,
    calibration: Arc<CalibrationService<B>>,
) -> Router
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
    B: CalibrationBackend + 'static,
{
    workflow_rule_router(workflows)
        .merge(calibration_router(calibration))
        .merge(analytics_router())
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use grc_automation::audit::InMemoryAuditLog;
    use grc_automation::http::{CAPABILITIES_HEADER, TENANT_HEADER};
    use grc_automation::workflows::calibration::{InMemoryCalibrationBackend, OutlierThresholds};
    use grc_automation::workflows::document_rules::InMemoryWorkflowRepository;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(ready: bool) -> (Router, Arc<AtomicBool>) {
        let readiness = Arc::new(AtomicBool::new(ready));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let workflows = Arc::new(DocumentWorkflowService::new(
            Arc::new(InMemoryWorkflowRepository::default()),
            Arc::new(InMemoryAuditLog::default()),
        ));
        let calibration = Arc::new(CalibrationService::new(
            Arc::new(InMemoryCalibrationBackend::default()),
            OutlierThresholds::default(),
        ));

        let router = build_router(workflows, calibration).layer(Extension(state));
        (router, readiness)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _) = app(true);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let (router, readiness) = app(false);
        let request = || {
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .expect("request")
        };

        let response = router.clone().oneshot(request()).await.expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["status"], "initializing");

        readiness.store(true, Ordering::Release);
        let response = router.oneshot(request()).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_use_prometheus_text_format() {
        let (router, _) = app(true);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn merged_routers_share_the_request_context() {
        let (router, _) = app(true);

        let rules = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/workflow-rules")
                    .header(TENANT_HEADER, "acme")
                    .header(CAPABILITIES_HEADER, "rules:read")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(rules.status(), StatusCode::OK);
        assert_eq!(body_json(rules).await, json!([]));

        let runs = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/calibration/runs")
                    .header(TENANT_HEADER, "acme")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(runs.status(), StatusCode::FORBIDDEN);
    }
}
